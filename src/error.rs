/// A macro for defining the `ErrorKind` enum, the `Display` implementation for
/// it, and the constructors for the `Error` struct.
macro_rules! ErrorKind {
    ($(
        ($kind:ident, $vis:vis $ctor:ident)
    ),* $(,)?) => {
        /// The kind of error that occurred.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum ErrorKind {
            $(
                $kind,
            )*
        }

        impl std::fmt::Display for ErrorKind {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        Self::$kind => f.write_str(stringify!($kind)),
                    )*
                }
            }
        }

        /// Constructors for [`Error`].
        impl Error {
            $(
                #[doc = concat!(
                    "Creates a new [`Error`] with the `",
                    stringify!($kind),
                    "` kind and the given description."
                )]
                $vis fn $ctor(desc: impl Into<String>) -> crate::error::Error {
                    Self {
                        kind: ErrorKind::$kind,
                        desc: desc.into(),
                        trace: vec![],
                    }
                }
            )*
        }
    };
}

ErrorKind!(
    (SettingWriteError,  pub setting_write_error),
    (RestorationFailure, pub restoration_failure),
    (GuardedRead,        pub guarded_read),
    (ReadOnly,           pub read_only),
    (Uninitialized,      pub uninitialized),
    (InvalidArgument,    pub invalid_argument),
    (OSError,            pub os_error),
);

/// Represents an error raised while reading, installing or restoring a
/// setting.
///
/// Errors raised by the body of an override are not wrapped in this type;
/// they are returned to the caller unchanged.
///
/// Use [format](crate::Error::format) to produce a representation of the
/// error that includes the settings it passed through.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    desc: String,
    trace: Vec<String>,
}

impl Error {
    /// Formats the error into a human-readable string, including the names of
    /// the settings involved.
    pub fn format(&self) -> String {
        let mut out = format!(
            "ERR {}:{}",
            self.kind,
            if self.desc.is_empty() {
                String::new()
            } else {
                format!(" {}", self.desc)
            }
        );
        for name in &self.trace {
            out.push_str(&format!("\n  at setting `{}`", name));
        }
        if self.is_fatal() {
            out.push_str("\n  ambient state may be inconsistent and must be inspected");
        }
        out + "\n"
    }

    /// Adds a setting name to the error's trace.
    pub fn with_trace(mut self, setting: impl Into<String>) -> Self {
        let setting = setting.into();
        if self.trace.last().is_some_and(|last| *last == setting) {
            return self;
        }
        self.trace.push(setting);
        self
    }

    /// Returns the kind of the error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the description of the error.
    pub fn desc(&self) -> String {
        self.desc.to_owned()
    }

    /// Returns the names of the settings the error passed through, innermost
    /// first.
    pub fn trace(&self) -> &[String] {
        &self.trace
    }

    /// Returns true if the error leaves ambient state in an unknown
    /// condition.
    pub fn is_fatal(&self) -> bool {
        self.kind == ErrorKind::RestorationFailure
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.desc.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.desc)
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::os_error(err.to_string())
    }
}
