pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Resolve command input: an `--input` file wins, then flags; piped stdin is
/// only consulted when the flags are incomplete.
pub fn resolve<T, F>(path: Option<&str>, from_flags: F) -> CliResult<T>
where
    T: DeserializeOwned,
    F: FnOnce() -> CliResult<T>,
{
    if let Some(path) = path {
        return file::read_input(path);
    }
    match from_flags() {
        Ok(value) => Ok(value),
        Err(flag_err) => match stdin::read_stdin()? {
            Some(data) => Ok(serde_json::from_value(data)?),
            None => Err(flag_err),
        },
    }
}
