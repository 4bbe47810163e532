// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::path::{Path, PathBuf};

use serde::Deserialize;

const DEFAULT_MANIFEST: &str = "bank.yaml";

/// Where to load the patch bank from.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Bank {
    /// Directory holding the bank. The bundled assets directory when unset.
    path: Option<PathBuf>,

    /// Manifest file name within the directory (default: bank.yaml)
    manifest: Option<String>,
}

impl Bank {
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn manifest(&self) -> &str {
        self.manifest.as_deref().unwrap_or(DEFAULT_MANIFEST)
    }
}
