use std::{
    fmt,
    fmt::{Debug, Display},
};

/// A wrapper that keeps secrets (provider tokens, API keys) out of logs and debug output.
/// The inner value is only accessible via an explicit [`Secret::reveal`] call, or by consuming
/// the wrapper with [`Secret::into_inner`].
#[derive(Clone, Default)]
pub struct Secret<T>
where T: Clone + Default
{
    value: T,
}

impl<T: Clone + Default> Secret<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn reveal(&self) -> &T {
        &self.value
    }

    /// Consumes the wrapper and hands back the inner value, for the places that must move the
    /// secret onward, such as a one-time registration response.
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T: Clone + Default> From<T> for Secret<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: Clone + Default> Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T: Clone + Default> Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}
