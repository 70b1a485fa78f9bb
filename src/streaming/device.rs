//! Device-prefixed path resolution.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::util::{Error, Result};

/// Maps `device:rest/of/path` names onto mounted filesystem roots.
#[derive(Debug, Clone, Default)]
pub struct DeviceResolver {
    mounts: BTreeMap<String, PathBuf>,
}

impl DeviceResolver {
    pub fn new(mounts: BTreeMap<String, PathBuf>) -> Self {
        Self { mounts }
    }

    pub fn mount(&mut self, device: impl Into<String>, root: impl Into<PathBuf>) {
        self.mounts.insert(device.into(), root.into());
    }

    pub fn mounts(&self) -> &BTreeMap<String, PathBuf> {
        &self.mounts
    }

    /// Filesystem path for a device-prefixed name.
    ///
    /// Names without a device, or with a one-letter device (a drive letter),
    /// are returned unchanged. Path separators after the device may be `/`
    /// or `\`. A `..` component after the device is rejected.
    pub fn resolve_path(&self, name: &str) -> Result<PathBuf> {
        let Some((device, rest)) = name.split_once(':') else {
            return Ok(PathBuf::from(name));
        };
        if device.len() <= 1 {
            return Ok(PathBuf::from(name));
        }
        let root = self
            .mounts
            .get(device)
            .ok_or_else(|| Error::UnknownDevice(device.to_string()))?;

        let mut path = root.clone();
        for part in rest.split(['/', '\\']) {
            match part {
                "" | "." => {}
                ".." => return Err(Error::PathEscapesRoot(name.to_string())),
                part => path.push(part),
            }
        }
        Ok(path)
    }
}
