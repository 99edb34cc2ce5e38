//! Arguments of a per-level logging call
//!
//! A call is one of three shapes, decided by its first argument:
//!
//! 1. an error: `(err, [msg, ...args])`
//! 2. anything that is not an object, or an array: `(msg, ...args)`
//! 3. otherwise: `(fields, msg, ...args)`; a null first argument means
//!    "no fields"
//!
//! [`LogArgs::classify`] makes that decision once, before the record is built.

use super::field_value::{ErrorValue, FieldObject, FieldValue};

/// Positional arguments of a logging call. Empty arguments make the call a
/// pure level query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogArgs {
    values: Vec<FieldValue>,
}

/// The classified shape of a non-empty call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallShape {
    Error {
        err: ErrorValue,
        msg_args: Vec<FieldValue>,
    },
    Message {
        msg_args: Vec<FieldValue>,
    },
    Fields {
        fields: Option<FieldObject>,
        msg_args: Vec<FieldValue>,
    },
}

impl LogArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one argument (builder form)
    #[must_use]
    pub fn arg(mut self, value: impl Into<FieldValue>) -> Self {
        self.values.push(value.into());
        self
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn as_slice(&self) -> &[FieldValue] {
        &self.values
    }

    /// Decide the call shape. Returns `None` for an empty call.
    ///
    /// A lazy first argument is evaluated here, so only call this once the
    /// level is known to be enabled.
    pub fn classify(self) -> Option<CallShape> {
        let mut values = self.values.into_iter();
        let first = values.next()?.resolve();
        let rest: Vec<FieldValue> = values.collect();

        Some(match first {
            FieldValue::Error(err) => CallShape::Error { err, msg_args: rest },
            FieldValue::Object(fields) => CallShape::Fields {
                fields: Some(fields),
                msg_args: rest,
            },
            FieldValue::Null => CallShape::Fields {
                fields: None,
                msg_args: rest,
            },
            // A timestamp first argument is formatted into the message, not
            // treated as a fields object.
            scalar => {
                let mut msg_args = Vec::with_capacity(rest.len() + 1);
                msg_args.push(scalar);
                msg_args.extend(rest);
                CallShape::Message { msg_args }
            }
        })
    }
}

impl From<()> for LogArgs {
    fn from(_: ()) -> Self {
        Self::new()
    }
}

impl From<Vec<FieldValue>> for LogArgs {
    fn from(values: Vec<FieldValue>) -> Self {
        Self { values }
    }
}

impl From<FieldValue> for LogArgs {
    fn from(value: FieldValue) -> Self {
        Self { values: vec![value] }
    }
}

impl From<&str> for LogArgs {
    fn from(msg: &str) -> Self {
        Self::new().arg(msg)
    }
}

impl From<String> for LogArgs {
    fn from(msg: String) -> Self {
        Self::new().arg(msg)
    }
}

impl From<ErrorValue> for LogArgs {
    fn from(err: ErrorValue) -> Self {
        Self::new().arg(err)
    }
}

impl From<FieldObject> for LogArgs {
    fn from(fields: FieldObject) -> Self {
        Self::new().arg(fields)
    }
}

macro_rules! impl_from_tuple {
    ($($name:ident),+) => {
        impl<$($name: Into<FieldValue>),+> From<($($name,)+)> for LogArgs {
            #[allow(non_snake_case)]
            fn from(($($name,)+): ($($name,)+)) -> Self {
                Self { values: vec![$($name.into()),+] }
            }
        }
    };
}

impl_from_tuple!(A);
impl_from_tuple!(A, B);
impl_from_tuple!(A, B, C);
impl_from_tuple!(A, B, C, D);
impl_from_tuple!(A, B, C, D, E);
impl_from_tuple!(A, B, C, D, E, F);
