use serde::{Deserialize, Serialize};

/// Chart colour scheme, passed into the assembler by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub dark: String,
    pub grey: String,
    pub light: String,
    pub stone: String,
    pub blue: String,
    pub green: String,
    pub red: String,
    pub pink: String,
    pub yellow: String,
    pub sky: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            dark: String::from("#252b33"),
            grey: String::from("#45464d"),
            light: String::from("#fefeff"),
            stone: String::from("#8f8f94"),
            blue: String::from("#336681"),
            green: String::from("#089389"),
            red: String::from("#d34748"),
            pink: String::from("#cf82d3"),
            yellow: String::from("#e6daaa"),
            sky: String::from("#8ebdff"),
        }
    }
}
