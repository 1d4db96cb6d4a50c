use std::{
    fmt,
    fs::File,
    io::{self, BufReader, BufWriter, StdoutLock, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use chrono::{Local, NaiveDate};

/// Where a command's JSON result goes.
#[derive(Debug)]
pub enum Output {
    Stdout(StdoutLock<'static>),
    File {
        writer: BufWriter<File>,
        path: PathBuf,
    },
}

impl Output {
    /// Writes `value` as pretty JSON to `path`, or to stdout when no path is given.
    pub fn save_json<T>(value: &T, path: Option<&Path>) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        let mut output = match path {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create output file: {}", path.display()))?;
                Output::File {
                    writer: BufWriter::new(file),
                    path: path.to_owned(),
                }
            }
            None => Output::Stdout(io::stdout().lock()),
        };
        output.write_json(value)
    }

    fn write_json<T>(&mut self, value: &T) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        let written = serde_json::to_writer_pretty(&mut *self, value)
            .map_err(io::Error::from)
            .and_then(|()| writeln!(self))
            .and_then(|()| self.flush());
        written.with_context(|| format!("Failed to write JSON to {self}"))
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Stdout(_) => f.write_str("stdout"),
            Output::File { path, .. } => write!(f, "{}", path.display()),
        }
    }
}

impl io::Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout(writer) => writer.write(buf),
            Output::File { writer, .. } => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout(writer) => writer.flush(),
            Output::File { writer, .. } => writer.flush(),
        }
    }
}

/// Reads a JSON document; `file_kind` names the file in error messages.
pub fn read_json_file<T>(file_kind: &str, path: &Path) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let file = File::open(path)
        .with_context(|| format!("Failed to open {file_kind} file: {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {file_kind} file: {}", path.display()))
}

/// The given date, or today in local time.
pub fn date_or_today(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| Local::now().date_naive())
}

#[cfg(test)]
mod tests {
    use std::{env, fs, process};

    use oxicoach_training::config::CoachConfig;

    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(format!("oxicoach-util-{}-{name}", process::id()))
    }

    #[test]
    fn test_save_then_read_config() {
        let path = temp_path("config.json");
        let config = CoachConfig {
            plan_courses: 2,
            ..CoachConfig::default()
        };
        Output::save_json(&config, Some(path.as_path())).unwrap();

        let back: CoachConfig = read_json_file("configuration", &path).unwrap();
        assert_eq!(back, config);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_errors_name_the_file() {
        let path = temp_path("missing.json");
        let err = read_json_file::<CoachConfig>("configuration", &path).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("configuration"));
        assert!(message.contains("missing.json"));

        fs::write(&path, "{ not json").unwrap();
        let err = read_json_file::<CoachConfig>("configuration", &path).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse configuration file"));
        fs::remove_file(&path).unwrap();
    }
}
