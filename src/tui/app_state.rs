#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub(super) enum InputField {
    DateFrom,
    DateTo,
    Url,
}

impl InputField {
    pub(super) fn title(self) -> &'static str {
        match self {
            InputField::DateFrom => {
                "From date YYYY-MM-DD (empty clears, Enter to apply, Esc to cancel)"
            }
            InputField::DateTo => {
                "To date YYYY-MM-DD (empty clears, Enter to apply, Esc to cancel)"
            }
            InputField::Url => "Repository URL (Enter to clone/pull, Esc to cancel)",
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub(super) enum AppMode {
    Normal,
    Editing(InputField),
}

/// One-line message shown under the file list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Banner {
    Info(String),
    Error(String),
}
