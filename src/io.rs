use std::fmt;
use std::fs;
use std::io::Write as _;
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::constants::Word;
use crate::memory::BackingStore;
use crate::vm_manager::VirtualMemory;

/// One line of an operation script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Write { address: u64, value: Word },
    Read { address: u64 },
}

/// Outcome of one scripted operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpResult {
    Written,
    Value(Word),
    Failed,
}

impl fmt::Display for OpResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpResult::Written => write!(f, "ok"),
            OpResult::Value(v) => write!(f, "{}", v),
            OpResult::Failed => write!(f, "err"),
        }
    }
}

pub fn read_script<P: AsRef<Path>>(path: P) -> Result<Vec<Operation>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;
    parse_script(&content)
}

/// Parse `w <address> <value>` and `r <address>` lines. Blank lines and
/// anything after `#` are ignored.
pub fn parse_script(content: &str) -> Result<Vec<Operation>> {
    let mut ops = Vec::new();
    for (number, line) in content.lines().enumerate() {
        let line = line.split('#').next().unwrap_or_default();
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        let op = parse_operation(&tokens).with_context(|| format!("line {}", number + 1))?;
        ops.push(op);
    }
    Ok(ops)
}

fn parse_operation(tokens: &[&str]) -> Result<Operation> {
    match tokens {
        ["w" | "write", address, value] => Ok(Operation::Write {
            address: parse_address(address)?,
            value: value.parse().with_context(|| format!("invalid value: {}", value))?,
        }),
        ["r" | "read", address] => Ok(Operation::Read {
            address: parse_address(address)?,
        }),
        _ => bail!(
            "expected `w <address> <value>` or `r <address>`, got `{}`",
            tokens.join(" ")
        ),
    }
}

/// Decimal, or hexadecimal with a `0x` prefix.
fn parse_address(token: &str) -> Result<u64> {
    let parsed = match token.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => token.parse(),
    };
    parsed.with_context(|| format!("invalid virtual address: {}", token))
}

/// Run every operation in order; failures are recorded, not fatal.
pub fn run_script<S: BackingStore>(vm: &mut VirtualMemory<S>, ops: &[Operation]) -> Vec<OpResult> {
    ops.iter()
        .map(|op| match *op {
            Operation::Write { address, value } => {
                vm.write(address, value).map_or(OpResult::Failed, |()| OpResult::Written)
            }
            Operation::Read { address } => {
                vm.read(address).map_or(OpResult::Failed, OpResult::Value)
            }
        })
        .collect()
}

pub fn read_virtual_addresses<P: AsRef<Path>>(path: P) -> Result<Vec<u64>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read input file {}", path.display()))?;
    content.split_whitespace().map(parse_address).collect()
}

pub fn join_results<T: fmt::Display>(results: &[T], separator: &str) -> String {
    let output: Vec<String> = results.iter().map(|r| r.to_string()).collect();
    output.join(separator)
}

/// Write to `path`, or to stdout when no path is given.
pub fn write_output(path: Option<&Path>, content: &str) -> Result<()> {
    match path {
        Some(path) => fs::write(path, content)
            .with_context(|| format!("failed to write output file {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", content).context("failed to write to stdout")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Geometry;

    #[test]
    fn test_parse_script() {
        let script = "# warm up\nw 13 3\n\nr 13   # read back\nread 0x10\nwrite 5 -2\n";
        let ops = parse_script(script).unwrap();
        assert_eq!(
            ops,
            vec![
                Operation::Write {
                    address: 13,
                    value: 3
                },
                Operation::Read { address: 13 },
                Operation::Read { address: 16 },
                Operation::Write {
                    address: 5,
                    value: -2
                },
            ]
        );
    }

    #[test]
    fn test_parse_script_reports_line() {
        let err = parse_script("w 1 2\nx 3\n").unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));

        assert!(parse_script("w 1").is_err());
        assert!(parse_script("r banana").is_err());
        assert!(parse_script("w 1 99999999999").is_err());
    }

    #[test]
    fn test_run_script() {
        let mut vm = VirtualMemory::new(Geometry::default());
        let ops = parse_script("w 13 3\nr 13\nr 1048576\nw 1048576 1\nr 6").unwrap();
        let results = run_script(&mut vm, &ops);
        assert_eq!(
            results,
            vec![
                OpResult::Written,
                OpResult::Value(3),
                OpResult::Failed,
                OpResult::Failed,
                OpResult::Value(0),
            ]
        );
        assert_eq!(join_results(&results, " "), "ok 3 err err 0");
    }

    #[test]
    fn test_join_results() {
        assert_eq!(join_results(&[4608i64, 5047, -1], " "), "4608 5047 -1");
        assert_eq!(join_results::<i64>(&[], " "), "");
    }
}
