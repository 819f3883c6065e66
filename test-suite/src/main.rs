use anyhow::{anyhow, bail, Context, Result};
use glob::glob;
use std::result::Result as StdResult;

use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

use std::io::Write;

/// Runs every `tests/*.oml` and compares its stdout with the `.out` file next
/// to it. A `.in` file is fed to stdin, a `.args` file holds extra flags.
fn main() -> Result<()> {
    compile_oml().context("compiling interpreter")?;

    let scripts: Vec<_> = glob("tests/*.oml")?.collect::<StdResult<_, _>>()?;
    let mut failed = 0;
    for script in &scripts {
        let expected_output = fs::read_to_string(script.with_extension("out"))
            .context(format!("loading expected output for {}", script.display()))?;
        let output = run_script(script).context(format!("running script {}", script.display()))?;
        if output == expected_output {
            println!("{}: passed", script.display());
        } else {
            failed += 1;
            println!("{}: failed\nactual output:\n{}", script.display(), output);
        }
    }
    if failed > 0 {
        bail!("{} of {} scripts failed", failed, scripts.len());
    }
    Ok(())
}

fn run_script(script: &Path) -> Result<String> {
    let args = fs::read_to_string(script.with_extension("args")).unwrap_or_default();
    let input = fs::read(script.with_extension("in")).unwrap_or_default();

    let mut child = Command::new("../target/release/oml")
        .args(args.split_whitespace())
        .arg("-f")
        .arg(script)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()?;
    child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("no stdin"))?
        .write_all(&input)?;
    let output = child.wait_with_output()?;
    Ok(String::from_utf8(output.stdout)?)
}

fn compile_oml() -> Result<()> {
    let st = Command::new("cargo")
        .args(["build", "--release", "-p", "oml"])
        .status()?;
    if st.success() {
        Ok(())
    } else {
        Err(anyhow!("compiling the interpreter failed"))
    }
}
