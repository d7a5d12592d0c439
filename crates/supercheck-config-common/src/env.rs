//! Environment-sourced secret loading with `*_FILE` indirection.

use std::path::PathBuf;

use supercheck_secret::SecretString;

#[derive(Debug, thiserror::Error)]
pub enum SecretEnvError {
	#[error("failed to read secret file {path}: {source}")]
	FileRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("both {env_var} and {env_var}_FILE are set; set only one")]
	Conflict { env_var: String },
}

/// Loads a secret from `{name}`, or from the file named by `{name}_FILE` if
/// the direct variable is absent. Returns `Ok(None)` if neither is set.
pub fn load_secret_env(name: &str) -> Result<Option<SecretString>, SecretEnvError> {
	let direct = std::env::var(name).ok().filter(|v| !v.is_empty());
	let file_var = format!("{name}_FILE");
	let from_file = std::env::var(&file_var).ok().filter(|v| !v.is_empty());

	match (direct, from_file) {
		(Some(_), Some(_)) => Err(SecretEnvError::Conflict {
			env_var: name.to_string(),
		}),
		(Some(value), None) => Ok(Some(SecretString::new(value))),
		(None, Some(path)) => {
			let path = PathBuf::from(path);
			let contents = std::fs::read_to_string(&path)
				.map_err(|source| SecretEnvError::FileRead { path, source })?;
			Ok(Some(SecretString::new(contents.trim_end().to_string())))
		}
		(None, None) => Ok(None),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Mutex;

	static ENV_LOCK: Mutex<()> = Mutex::new(());

	#[test]
	fn returns_none_when_unset() {
		let _guard = ENV_LOCK.lock().unwrap();
		std::env::remove_var("SC_TEST_SECRET_ABSENT");
		std::env::remove_var("SC_TEST_SECRET_ABSENT_FILE");
		assert!(load_secret_env("SC_TEST_SECRET_ABSENT").unwrap().is_none());
	}

	#[test]
	fn reads_direct_value() {
		let _guard = ENV_LOCK.lock().unwrap();
		std::env::set_var("SC_TEST_SECRET_DIRECT", "hunter2");
		let secret = load_secret_env("SC_TEST_SECRET_DIRECT").unwrap().unwrap();
		assert_eq!(secret.expose(), "hunter2");
		std::env::remove_var("SC_TEST_SECRET_DIRECT");
	}

	#[test]
	fn reads_from_file_indirection() {
		let _guard = ENV_LOCK.lock().unwrap();
		let file = tempfile::NamedTempFile::new().unwrap();
		std::fs::write(file.path(), "from-file-secret\n").unwrap();
		std::env::set_var("SC_TEST_SECRET_FILE", file.path());
		let secret = load_secret_env("SC_TEST_SECRET").unwrap().unwrap();
		assert_eq!(secret.expose(), "from-file-secret");
		std::env::remove_var("SC_TEST_SECRET_FILE");
	}

	#[test]
	fn conflict_when_both_set() {
		let _guard = ENV_LOCK.lock().unwrap();
		std::env::set_var("SC_TEST_SECRET_BOTH", "a");
		std::env::set_var("SC_TEST_SECRET_BOTH_FILE", "/dev/null");
		let result = load_secret_env("SC_TEST_SECRET_BOTH");
		assert!(matches!(result, Err(SecretEnvError::Conflict { .. })));
		std::env::remove_var("SC_TEST_SECRET_BOTH");
		std::env::remove_var("SC_TEST_SECRET_BOTH_FILE");
	}
}
