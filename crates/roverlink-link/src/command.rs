use std::fmt;
use std::str::FromStr;

/// Which control stick produced an input sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stick {
    Left,
    Right,
}

/// One outbound drive command: direction and speed for each motor side.
///
/// Direction is `0` (reverse) or `1` (forward); speed is `0..=255`. On the
/// wire the command is the ASCII decimal string
/// `"<left_dir>,<left_speed>,<right_dir>,<right_speed>"`, which keeps the
/// payload free of the frame end marker by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DriveCommand {
    pub left_direction: u8,
    pub left_speed: u8,
    pub right_direction: u8,
    pub right_speed: u8,
}

impl DriveCommand {
    pub const fn new(
        left_direction: u8,
        left_speed: u8,
        right_direction: u8,
        right_speed: u8,
    ) -> Self {
        Self {
            left_direction,
            left_speed,
            right_direction,
            right_speed,
        }
    }

    /// A full stop on both sides.
    pub const fn stop() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Apply a normalized vertical stick deflection to one side.
    ///
    /// `percent_y` is in `[-1.0, 1.0]`; negative deflection (stick pushed up
    /// on screen) drives that side in direction 0, positive in direction 1,
    /// with speed scaled to `0..=255`. Out-of-range input is clamped.
    pub fn apply_stick(&mut self, stick: Stick, percent_y: f32) {
        let percent_y = percent_y.clamp(-1.0, 1.0);
        let (direction, speed) = if percent_y < 0.0 {
            (0, (-255.0 * percent_y) as u8)
        } else {
            (1, (255.0 * percent_y) as u8)
        };
        match stick {
            Stick::Left => {
                self.left_direction = direction;
                self.left_speed = speed;
            }
            Stick::Right => {
                self.right_direction = direction;
                self.right_speed = speed;
            }
        }
    }

    /// The wire payload for this command.
    pub fn to_wire(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DriveCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.left_direction, self.left_speed, self.right_direction, self.right_speed
        )
    }
}

/// Errors parsing a drive command from its wire text.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseCommandError {
    #[error("expected 4 comma-separated fields, got {0}")]
    FieldCount(usize),

    #[error("field {index} is not a decimal in range: {value:?}")]
    Field { index: usize, value: String },

    #[error("direction field {index} must be 0 or 1, got {value}")]
    Direction { index: usize, value: u8 },
}

impl FromStr for DriveCommand {
    type Err = ParseCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(',').collect();
        if fields.len() != 4 {
            return Err(ParseCommandError::FieldCount(fields.len()));
        }

        let mut values = [0u8; 4];
        for (index, field) in fields.iter().enumerate() {
            values[index] = field
                .trim()
                .parse()
                .map_err(|_| ParseCommandError::Field {
                    index,
                    value: (*field).to_string(),
                })?;
        }

        for index in [0, 2] {
            if values[index] > 1 {
                return Err(ParseCommandError::Direction {
                    index,
                    value: values[index],
                });
            }
        }

        Ok(Self::new(values[0], values[1], values[2], values[3]))
    }
}
