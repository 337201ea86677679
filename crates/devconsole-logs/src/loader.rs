use crate::error::LoadError;

/// Loads optional helper libraries by name. Completion is reported later
/// through [`crate::Console::finish_load`].
pub trait HelperLoader {
    fn load(&mut self, name: &str);
}

/// Completion of a helper library load
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadOutcome {
    pub name: String,
    pub result: Result<(), LoadError>,
}

impl LoadOutcome {
    pub fn loaded(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            result: Ok(()),
        }
    }

    pub fn failed(name: impl Into<String>, error: LoadError) -> Self {
        Self {
            name: name.into(),
            result: Err(error),
        }
    }
}
