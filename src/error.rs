//! Common error definitions.

use crate::timer::TimerError;

macro_rules! impl_from_error {
    ($error:ident) => {
        impl From<$error> for Error {
            fn from(error: $error) -> Self {
                Self::$error(error)
            }
        }
    };
}

/// Alias for Result<T, Error>.
pub type Result<T> = core::result::Result<T, Error>;

/// Collection of all errors that can occur.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Error {
    /// Timer and PWM channel setup errors.
    TimerError(TimerError),
}

impl_from_error!(TimerError);

#[cfg(feature = "embedded_hal")]
mod embedded_hal_impl {
    use embedded_hal::pwm::{Error as PwmEhError, ErrorKind as PwmErrorKind};

    use super::Error;

    impl PwmEhError for Error {
        fn kind(&self) -> PwmErrorKind {
            PwmErrorKind::Other
        }
    }
}
