// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

const SCRIPT: &str = "#!/bin/bash\n#SBATCH --job-name=train\n#SBATCH --time=01:00:00\n\npython train.py\n";

fn overrides(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn replaces_existing_directive() {
    let out = apply_directives(SCRIPT, &overrides(&[("time", "04:00:00")])).unwrap();
    assert_eq!(
        out,
        "#!/bin/bash\n#SBATCH --job-name=train\n#SBATCH --time=04:00:00\n\npython train.py\n"
    );
}

#[test]
fn appends_after_last_directive() {
    let out = apply_directives(SCRIPT, &overrides(&[("mem", "64G")])).unwrap();
    assert_eq!(
        out,
        "#!/bin/bash\n#SBATCH --job-name=train\n#SBATCH --time=01:00:00\n#SBATCH --mem=64G\n\npython train.py\n"
    );
}

#[test]
fn inserts_after_shebang_without_directives() {
    let out = apply_directives("#!/bin/sh\necho hi\n", &overrides(&[("mem", "8G")])).unwrap();
    assert_eq!(out, "#!/bin/sh\n#SBATCH --mem=8G\necho hi\n");
}

#[test]
fn inserts_at_top_without_shebang() {
    let out = apply_directives("echo hi", &overrides(&[("partition", "gpu")])).unwrap();
    assert_eq!(out, "#SBATCH --partition=gpu\necho hi");
}

#[test]
fn underscores_become_hyphens_and_match_existing() {
    let script = "#!/bin/bash\n#SBATCH --cpus-per-task 4\nrun\n";
    let out = apply_directives(script, &overrides(&[("cpus_per_task", "8")])).unwrap();
    assert_eq!(out, "#!/bin/bash\n#SBATCH --cpus-per-task=8\nrun\n");
}

#[test]
fn empty_value_is_a_flag() {
    let out = apply_directives(SCRIPT, &overrides(&[("requeue", "")])).unwrap();
    assert!(out.contains("#SBATCH --requeue\n"), "{out}");
}

#[test]
fn no_overrides_leaves_script_unchanged() {
    assert_eq!(apply_directives(SCRIPT, &BTreeMap::new()).unwrap(), SCRIPT);
}

#[parameterized(
    space = { "mem limit" },
    equals = { "mem=1" },
    empty = { "" },
    leading_hyphen = { "---x" },
)]
fn invalid_keys(key: &str) {
    assert_eq!(
        apply_directives(SCRIPT, &overrides(&[(key, "1")])),
        Err(ScriptError::InvalidKey(key.to_string()))
    );
}

#[test]
fn multiline_values_are_rejected() {
    assert_eq!(
        apply_directives(SCRIPT, &overrides(&[("comment", "a\nrm -rf ~")])),
        Err(ScriptError::MultilineValue("comment".to_string()))
    );
}
