use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Cannot read concierge config {}.", path.display())]
	Read { path: PathBuf, source: std::io::Error },
	#[error("Concierge config {} is not valid TOML.", path.display())]
	Parse { path: PathBuf, source: toml::de::Error },
	/// A field parsed but holds an unusable value.
	#[error("{message}")]
	Validation { message: String },
}
