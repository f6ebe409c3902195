//! Black-box behavioral checks against the public `Shell::exec` surface,
//! covering the documented boundary scenarios and invariants.

use vshbash::shell::{Shell, ShellOptions};

async fn shell_with(files: &[(&str, &str)]) -> Shell {
    let mut map = std::collections::HashMap::new();
    for (path, content) in files {
        map.insert(path.to_string(), (*content).into());
    }
    Shell::new(ShellOptions { files: Some(map), ..Default::default() }).await
}

#[tokio::test]
async fn cat_piped_through_grep() {
    let mut shell = shell_with(&[("/data/f.txt", "hello\n")]).await;
    let result = shell.exec("cat /data/f.txt | grep hello", None).await;
    assert_eq!(result.stdout, "hello\n");
    assert_eq!(result.stderr, "");
    assert_eq!(result.exit_code, 0);
}

#[tokio::test]
async fn missing_file_in_pipeline_exits_on_last_stage() {
    let mut shell = Shell::new(ShellOptions::default()).await;
    let result = shell.exec("ls /no_such | cat", None).await;
    assert_eq!(result.stdout, "");
    assert!(result.stderr.contains("No such file"), "stderr was: {}", result.stderr);
    assert_eq!(result.exit_code, 0);
}

#[tokio::test]
async fn grep_no_match_exits_nonzero() {
    let mut shell = Shell::new(ShellOptions::default()).await;
    let result = shell.exec("echo hello | grep nomatch", None).await;
    assert_eq!(result.stdout, "");
    assert_eq!(result.exit_code, 1);
}

#[tokio::test]
async fn pipefail_propagates_failing_stage() {
    let mut shell = Shell::new(ShellOptions::default()).await;
    let result = shell.exec("set -o pipefail; false | true", None).await;
    assert_eq!(result.exit_code, 1);
}

#[tokio::test]
async fn pipe_stderr_operator_merges_into_next_stdin() {
    let mut shell = Shell::new(ShellOptions::default()).await;
    let result = shell.exec("ls /no_such |& cat", None).await;
    assert!(result.stdout.contains("No such file"), "stdout was: {}", result.stdout);
    assert_eq!(result.stderr, "");
}

#[tokio::test]
async fn subshell_assignment_does_not_leak() {
    let mut shell = Shell::new(ShellOptions::default()).await;
    let result = shell.exec("X=outer; (X=inner; echo $X); echo $X", None).await;
    assert_eq!(result.stdout, "inner\nouter\n");
}

#[tokio::test]
async fn for_loop_output_piped_to_sort() {
    let mut shell = Shell::new(ShellOptions::default()).await;
    let result = shell.exec("for i in 3 1 2; do echo $i; done | sort", None).await;
    assert_eq!(result.stdout, "1\n2\n3\n");
}

#[tokio::test]
async fn pipestatus_records_every_stage_exit_code() {
    let mut shell = Shell::new(ShellOptions::default()).await;
    let result = shell
        .exec("true | false | true; echo ${PIPESTATUS[0]} ${PIPESTATUS[1]} ${PIPESTATUS[2]}", None)
        .await;
    assert_eq!(result.stdout, "0 1 0\n");
}

#[tokio::test]
async fn assoc_array_subscript_access() {
    let mut shell = Shell::new(ShellOptions::default()).await;
    let result = shell.exec("declare -A m; m[a]=1; m[b]=2; echo ${m[a]} ${m[b]}", None).await;
    assert_eq!(result.stdout, "1 2\n");
}

#[tokio::test]
async fn command_substitution_feeds_word_count() {
    let mut shell = Shell::new(ShellOptions::default()).await;
    let result = shell.exec(r#"echo "count: $(echo -e 'a\nb\nc' | wc -l)""#, None).await;
    assert_eq!(result.stdout, "count: 3\n");
}

#[tokio::test]
async fn write_then_read_round_trips_bytes() {
    let mut shell = Shell::new(ShellOptions::default()).await;
    shell.write_file("/tmp/f.txt", "payload").await.unwrap();
    let content = shell.read_file("/tmp/f.txt").await.unwrap();
    assert_eq!(content, "payload");
}

#[tokio::test]
async fn echo_n_then_cat_has_no_trailing_newline() {
    let mut shell = Shell::new(ShellOptions::default()).await;
    let result = shell.exec("echo -n X > /tmp/f; cat /tmp/f", None).await;
    assert_eq!(result.stdout, "X");
}

#[tokio::test]
async fn nounset_fails_on_unset_variable() {
    let mut shell = Shell::new(ShellOptions::default()).await;
    let result = shell.exec("set -u; echo $UNDEFINED_VAR", None).await;
    assert_eq!(result.exit_code, 2);
}

#[tokio::test]
async fn command_not_found_is_contained_and_script_continues() {
    let mut shell = Shell::new(ShellOptions::default()).await;
    let result = shell.exec("nonexistent_cmd; echo after", None).await;
    assert!(result.stderr.contains("nonexistent_cmd: command not found"), "stderr was: {}", result.stderr);
    assert_eq!(result.stdout, "after\n");
}

#[tokio::test]
async fn nounset_error_is_contained_and_script_continues() {
    let mut shell = Shell::new(ShellOptions::default()).await;
    let result = shell.exec("set -u; echo $UNDEF; echo after", None).await;
    assert_eq!(result.stdout, "after\n");
}

#[tokio::test]
async fn errexit_stops_script_after_failing_command() {
    let mut shell = Shell::new(ShellOptions::default()).await;
    let result = shell.exec("set -e; nonexistent_cmd; echo after", None).await;
    assert_eq!(result.stdout, "");
    assert_eq!(result.exit_code, 127);
}

#[tokio::test]
async fn quoted_at_expands_to_one_field_per_positional_param() {
    let mut shell = Shell::new(ShellOptions::default()).await;
    let result = shell.exec(r#"set -- a b c; for x in "$@"; do echo "[$x]"; done"#, None).await;
    assert_eq!(result.stdout, "[a]\n[b]\n[c]\n");
}

#[tokio::test]
async fn star_joins_by_first_ifs_byte() {
    let mut shell = Shell::new(ShellOptions::default()).await;
    let result = shell.exec(r#"set -- a b c; IFS=-; echo "$*""#, None).await;
    assert_eq!(result.stdout, "a-b-c\n");
}

#[tokio::test]
async fn subscripted_indexed_array_assignment() {
    let mut shell = Shell::new(ShellOptions::default()).await;
    let result = shell.exec("arr[0]=x; arr[2]=z; echo ${arr[0]} ${arr[1]} ${arr[2]}", None).await;
    assert_eq!(result.stdout, "x  z\n");
}
