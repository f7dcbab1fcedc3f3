/// Print to stderr before tracing is installed.
#[macro_export]
macro_rules! bootstrap {
    ($x:expr $( , $xs:expr )* $(,)?) => {
        eprintln!("[{} bootstrap] {}", $crate::build::PACKAGE, format_args!($x $( , $xs )*))
    };
}

/// Log the error of a `Result` at `error` level and convert it to an `Option`.
#[macro_export]
macro_rules! trace_catch {
    ($val:expr, $($rest:tt)*) => {
        match $val {
            Ok(value) => Some(value),
            Err(e) => {
                ::tracing::error!(error = %e, $($rest)*);
                None
            },
        }
    };
}

#[cfg(test)]
mod test {
    #[test]
    fn trace_catch_discards_errors() {
        let failed: Result<u8, std::fmt::Error> = Err(std::fmt::Error);
        assert_eq!(None, trace_catch!(failed, "formatting failed"));

        let ok: Result<u8, std::fmt::Error> = Ok(3);
        assert_eq!(Some(3), trace_catch!(ok, "unreachable"));
    }
}
