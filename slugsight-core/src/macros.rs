// Logging front-ends. Everything goes to the `log` facade; with the `defmt`
// feature the same message is also sent over the defmt transport.

#[cfg(feature = "defmt")]
#[doc(hidden)]
#[macro_export]
macro_rules! __forward_log {
    ($level:ident, $($arg:tt)*) => {{
        ::defmt::$level!($($arg)*);
        ::log::$level!($($arg)*);
    }};
}

#[cfg(not(feature = "defmt"))]
#[doc(hidden)]
#[macro_export]
macro_rules! __forward_log {
    ($level:ident, $($arg:tt)*) => {{
        ::log::$level!($($arg)*);
    }};
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::__forward_log!(info, $($arg)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::__forward_log!(warn, $($arg)*)
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::__forward_log!(error, $($arg)*)
    };
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::__forward_log!(debug, $($arg)*)
    };
}

#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        $crate::__forward_log!(trace, $($arg)*)
    };
}
