use host::config::{FileConfig, Settings};
use std::io::Write;

#[test]
fn cli_target_overrides_the_config_file() {
  let mut file = tempfile::NamedTempFile::new().unwrap();
  writeln!(file, "target = \"127.0.0.1:2000\"\ncard_id = 3").unwrap();
  let file_config = FileConfig::load(file.path()).unwrap();

  let cli_target = "10.0.0.9:2000".parse().unwrap();
  let settings = Settings::resolve(file_config, Some(cli_target), None, None).unwrap();

  assert_eq!(settings.target, cli_target);
  assert_eq!(settings.card_id, 3);
}

#[test]
fn a_config_file_alone_is_sufficient() {
  let mut file = tempfile::NamedTempFile::new().unwrap();
  writeln!(file, "target = \"127.0.0.1:2000\"").unwrap();
  let file_config = FileConfig::load(file.path()).unwrap();

  let settings = Settings::resolve(file_config, None, None, None).unwrap();
  assert_eq!(settings.target.to_string(), "127.0.0.1:2000");
  assert_eq!(settings.card_id, 0);
}

#[test]
fn neither_cli_nor_file_target_is_an_error() {
  let settings = Settings::resolve(FileConfig::default(), None, None, None);
  assert!(settings.is_err());
}
