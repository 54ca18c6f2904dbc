use std::fmt;

/// Number of options every quiz poll carries.
pub const OPTION_COUNT: usize = 4;
/// Telegram's limits on poll text, in characters.
pub const MAX_QUESTION_CHARS: usize = 300;
pub const MAX_OPTION_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    text: String,
    options: Vec<String>,
    correct_option: u8,
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.text())?;
        for (i, option) in self.options().iter().enumerate() {
            let mark = if i == self.correct_option() { 'V' } else { 'X' };
            writeln!(f, "{}) {} ({})", i + 1, option, mark)?;
        }
        Ok(())
    }
}

impl Question {
    /// Callers are expected to have checked the option count and index range.
    pub(crate) fn new(text: String, options: Vec<String>, correct_option: u8) -> Self {
        debug_assert_eq!(options.len(), OPTION_COUNT);
        debug_assert!((correct_option as usize) < OPTION_COUNT);
        Self {
            text,
            options,
            correct_option,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn correct_option(&self) -> usize {
        self.correct_option as usize
    }

    pub fn correct_answer(&self) -> &str {
        &self.options[self.correct_option()]
    }
}
