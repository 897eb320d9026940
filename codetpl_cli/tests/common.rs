use assert_cmd::Command;

pub fn codetpl_cmd() -> Command {
	let mut cmd = Command::cargo_bin("codetpl").expect("codetpl binary builds");
	cmd.env("NO_COLOR", "1");
	cmd
}
