use assert_cmd::Command;
use predicates::prelude::*;

fn aws_waiter() -> Command {
    let mut command = Command::cargo_bin("aws-waiter").expect("binary should be built");
    command
        .env_remove("AWS_WAITER_DATA_PATH")
        .env_remove("AWS_REGION")
        .env_remove("AWS_DEFAULT_REGION");
    command
}

#[test]
fn help_lists_bundled_services() {
    aws_waiter()
        .arg("--help")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("ec2"))
        .stdout(predicate::str::contains("dynamodb"))
        .stdout(predicate::str::contains("--endpoint-url"));
}

#[test]
fn version_is_printed() {
    aws_waiter()
        .arg("--version")
        .assert()
        .code(0)
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn wait_help_lists_every_waiter() {
    aws_waiter()
        .args(["ec2", "wait", "--help"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Wait until a particular condition is satisfied."))
        .stdout(predicate::str::contains("instance-running"))
        .stdout(predicate::str::contains("instance-stopped"))
        .stdout(predicate::str::contains("vpc-available"));
}

#[test]
fn waiter_help_shows_parameters_and_description() {
    aws_waiter()
        .args(["ec2", "wait", "instance-running", "--help"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("--filters"))
        .stdout(predicate::str::contains("--instance-ids"))
        .stdout(predicate::str::contains("(list)"))
        .stdout(predicate::str::contains(
            "when polling with `describe-instances`.",
        ));
}

#[test]
fn wait_without_waiter_name_is_a_usage_error() {
    aws_waiter()
        .args(["ec2", "wait"])
        .assert()
        .code(252)
        .stderr(predicate::str::contains("waiter_name"));
}

#[test]
fn service_without_waiters_has_no_wait_command() {
    aws_waiter().args(["sts", "wait"]).assert().code(252);
}

#[test]
fn unknown_waiter_is_a_usage_error() {
    aws_waiter()
        .args(["ec2", "wait", "instance-dancing"])
        .assert()
        .code(252);
}

#[test]
fn missing_required_parameter_is_a_usage_error() {
    aws_waiter()
        .args(["dynamodb", "wait", "table-exists"])
        .assert()
        .code(252)
        .stderr(predicate::str::contains("--table-name"));
}

#[test]
fn missing_region_is_a_usage_error() {
    aws_waiter()
        .args(["dynamodb", "wait", "table-exists", "--table-name", "orders"])
        .assert()
        .code(252)
        .stderr(predicate::str::contains("You must specify a region"));
}

#[test]
fn malformed_json_parameter_is_a_usage_error() {
    aws_waiter()
        .args([
            "ec2",
            "wait",
            "instance-running",
            "--filters",
            "{not json",
            "--region",
            "us-east-1",
        ])
        .assert()
        .code(252)
        .stderr(predicate::str::contains("Error parsing parameter '--filters'"));
}

#[test]
fn data_path_entry_must_be_a_directory() {
    let file = tempfile::NamedTempFile::new().unwrap();
    aws_waiter()
        .env("AWS_WAITER_DATA_PATH", file.path())
        .arg("--help")
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a directory"));
}
