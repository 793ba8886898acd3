use std::path::Path;

use super::RunOptions;

pub fn run(file: &Path, opts: &RunOptions) -> Result<(), String> {
    let config = super::load_config(file)?;
    let engine = super::fight(config, opts)?;
    super::print_outcome(&engine, opts)
}
