//! Menu text and input parsing.
//!
//! Raw lines are parsed once into typed commands; the session only ever
//! matches on these types.

use std::io::Write;

use contracts::Catalog;

use crate::error::{Result, SessionError};

/// Top-level menu entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuCommand {
    AddVehicle,
    AddPedestrian,
    ChangeWeather,
    ChangeMap,
    ViewPov,
    Exit,
    ToggleManualDriving,
    /// Anything else, kept for the diagnostic
    Invalid(String),
}

impl MenuCommand {
    pub fn parse(input: &str) -> Self {
        match input.trim() {
            "1" => Self::AddVehicle,
            "2" => Self::AddPedestrian,
            "3" => Self::ChangeWeather,
            "4" => Self::ChangeMap,
            "5" => Self::ViewPov,
            "6" => Self::Exit,
            "7" => Self::ToggleManualDriving,
            other => Self::Invalid(other.to_string()),
        }
    }

    /// Metrics label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AddVehicle => "add_vehicle",
            Self::AddPedestrian => "add_pedestrian",
            Self::ChangeWeather => "change_weather",
            Self::ChangeMap => "change_map",
            Self::ViewPov => "view_pov",
            Self::Exit => "exit",
            Self::ToggleManualDriving => "toggle_manual_driving",
            Self::Invalid(_) => "invalid",
        }
    }
}

/// Answer to "which vehicle?"
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VehicleChoice {
    Random,
    /// Zero-based catalog position
    Catalog(usize),
    /// Free-text catalog name
    Name(String),
}

impl VehicleChoice {
    /// Parse against a catalog of `count` vehicles
    ///
    /// `1` or `random` picks at random; `n >= 2` selects catalog entry `n - 2`.
    pub fn parse(input: &str, count: usize) -> Result<Self> {
        let input = input.trim();
        if input.eq_ignore_ascii_case("random") {
            return Ok(Self::Random);
        }

        if !input.is_empty() && input.chars().all(|c| c.is_ascii_digit()) {
            return match input.parse::<usize>() {
                Ok(1) => Ok(Self::Random),
                Ok(n) if n >= 2 && n - 2 < count => Ok(Self::Catalog(n - 2)),
                _ => Err(SessionError::invalid_index(input, count + 2)),
            };
        }

        Ok(Self::Name(input.to_string()))
    }
}

/// Parse a zero-based index into a list of `count` items
pub fn parse_index(input: &str, count: usize) -> Result<usize> {
    let input = input.trim();
    if input.is_empty() || !input.chars().all(|c| c.is_ascii_digit()) {
        return Err(SessionError::invalid_index(input, count));
    }
    match input.parse::<usize>() {
        Ok(index) if index < count => Ok(index),
        _ => Err(SessionError::invalid_index(input, count)),
    }
}

pub fn print_main_menu(out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "CARLA Simulator Control Menu:")?;
    writeln!(out, "1. Add vehicle")?;
    writeln!(out, "2. Add pedestrian")?;
    writeln!(out, "3. Change weather")?;
    writeln!(out, "4. Change map")?;
    writeln!(out, "5. View vehicle POV")?;
    writeln!(out, "6. Exit")?;
    writeln!(out, "7. Toggle manual driving")?;
    write!(out, "Enter your choice: ")?;
    out.flush()
}

pub fn print_vehicle_menu(out: &mut impl Write, catalog: &Catalog) -> std::io::Result<()> {
    writeln!(out, "Choose vehicle:")?;
    writeln!(out, "1. Random")?;
    writeln!(out, "Available vehicles:")?;
    for (index, entry) in catalog.vehicles.iter().enumerate() {
        writeln!(out, "{}. {}", index + 2, entry.display_name)?;
    }
    write!(out, "Enter vehicle number, name or 'random': ")?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_menu_commands() {
        assert_eq!(MenuCommand::parse("1\n"), MenuCommand::AddVehicle);
        assert_eq!(MenuCommand::parse(" 6 "), MenuCommand::Exit);
        assert_eq!(MenuCommand::parse("7"), MenuCommand::ToggleManualDriving);
        assert_eq!(
            MenuCommand::parse("nine"),
            MenuCommand::Invalid("nine".to_string())
        );
        assert_eq!(MenuCommand::parse(""), MenuCommand::Invalid(String::new()));
    }

    #[test]
    fn test_parse_vehicle_choice() {
        assert_eq!(VehicleChoice::parse("1", 3).unwrap(), VehicleChoice::Random);
        assert_eq!(
            VehicleChoice::parse("RANDOM", 3).unwrap(),
            VehicleChoice::Random
        );
        assert_eq!(
            VehicleChoice::parse("2", 3).unwrap(),
            VehicleChoice::Catalog(0)
        );
        assert_eq!(
            VehicleChoice::parse("4", 3).unwrap(),
            VehicleChoice::Catalog(2)
        );
        assert_eq!(
            VehicleChoice::parse("Audi TT", 3).unwrap(),
            VehicleChoice::Name("Audi TT".to_string())
        );
    }

    #[test]
    fn test_vehicle_choice_out_of_range() {
        assert!(matches!(
            VehicleChoice::parse("5", 3),
            Err(SessionError::InvalidIndex { .. })
        ));
        assert!(matches!(
            VehicleChoice::parse("0", 3),
            Err(SessionError::InvalidIndex { .. })
        ));
    }

    #[test]
    fn test_parse_index() {
        assert_eq!(parse_index("0", 2).unwrap(), 0);
        assert_eq!(parse_index(" 1 ", 2).unwrap(), 1);
        assert!(parse_index("2", 2).is_err());
        assert!(parse_index("-1", 2).is_err());
        assert!(parse_index("abc", 2).is_err());
        assert!(parse_index("+0", 2).is_err());
        assert!(parse_index("", 2).is_err());
    }

    #[test]
    fn test_main_menu_text() {
        let mut out = Vec::new();
        print_main_menu(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("1. Add vehicle"));
        assert!(text.contains("6. Exit"));
        assert!(text.ends_with("Enter your choice: "));
    }
}
