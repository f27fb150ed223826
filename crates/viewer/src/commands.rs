//! Plain-text camera commands exchanged with a companion process.

use glam::{Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Rotation(Quat),
    Translation(Vec3),
}

impl Command {
    /// Formats as the wire line, e.g. `rotation 0 0 0 1`.
    pub fn format(&self) -> String {
        match self {
            Command::Rotation(q) => format!("rotation {} {} {} {}", q.x, q.y, q.z, q.w),
            Command::Translation(t) => format!("translation {} {} {}", t.x, t.y, t.z),
        }
    }

    /// Parses a wire line; unknown verbs and malformed numbers yield None.
    pub fn parse(line: &str) -> Option<Command> {
        let mut parts = line.split_whitespace();
        let verb = parts.next()?;
        let nums: Vec<f32> = parts.map(str::parse).collect::<Result<_, _>>().ok()?;
        match (verb, nums.len()) {
            ("rotation", 4) => Some(Command::Rotation(Quat::from_xyzw(
                nums[0], nums[1], nums[2], nums[3],
            ))),
            ("translation", 3) => {
                Some(Command::Translation(Vec3::new(nums[0], nums[1], nums[2])))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_round_trip() {
        let cmd = Command::Rotation(Quat::from_xyzw(0.5, -0.5, 0.25, 1.0));
        let parsed = Command::parse(&cmd.format()).unwrap();
        assert_eq!(parsed, cmd);
    }

    #[test]
    fn translation_round_trip() {
        let cmd = Command::Translation(Vec3::new(1.5, 0.0, -3.25));
        let parsed = Command::parse(&cmd.format()).unwrap();
        assert_eq!(parsed, cmd);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(Command::parse("rotation 1 2 3"), None);
        assert_eq!(Command::parse("translation 1 2 3 4"), None);
        assert_eq!(Command::parse("rotation a b c d"), None);
        assert_eq!(Command::parse("select 1"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[test]
    fn tolerates_extra_whitespace() {
        let parsed = Command::parse("  translation   1  2   3 ").unwrap();
        assert_eq!(parsed, Command::Translation(Vec3::new(1.0, 2.0, 3.0)));
    }
}
