/// Get the version string for sreg and libsreg
pub fn get_version_string() -> String {
    format!(
        "sreg {}\nlibsreg {}",
        env!("CARGO_PKG_VERSION"),
        libsreg::version()
    )
}

/// Print version information to stdout
pub fn print_version() {
    println!("{}", get_version_string());
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod tests;
