// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-License-Identifier: MIT

/// Write `content` to `path`, refusing to overwrite an existing file.
pub fn create_template(path: &str, content: &str) -> anyhow::Result<()> {
    if path.is_empty() {
        anyhow::bail!("empty path for the configuration template");
    }
    match std::path::Path::new(&path).exists() {
        true => anyhow::bail!("cannot overwrite configuration file: {}", path),
        false => {
            std::fs::write(path, content)?;
            Ok(())
        }
    }
}
