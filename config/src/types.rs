//! Flag value types: device selection and 0/1 switches.

use serde::{Deserialize, Serialize};

/// Which GPUs a run should use.
///
/// Examples:
/// - `"0"` → no GPU, the backend's default device
/// - `"2"` → the first two devices
/// - `"0,2"` → devices 0 and 2
/// - `"1,"` → device 1 only, given as a list
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GpuSpec {
    Count(usize),
    Indices(Vec<usize>),
}

impl GpuSpec {
    /// True only for the plain count `1`.
    ///
    /// A one-element index list is not single: it names a device explicitly
    /// and still goes through the data-parallel strategy.
    #[must_use]
    pub fn is_single(&self) -> bool {
        matches!(self, Self::Count(1))
    }

    /// Device indices this spec selects, in order.
    #[must_use]
    pub fn device_indices(&self) -> Vec<usize> {
        match self {
            Self::Count(n) => (0..*n).collect(),
            Self::Indices(indices) => indices.clone(),
        }
    }
}

impl Default for GpuSpec {
    fn default() -> Self {
        Self::Count(1)
    }
}

impl std::str::FromStr for GpuSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains(',') {
            let mut indices = Vec::new();
            for part in s.split(',') {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                let index: usize = part
                    .parse()
                    .map_err(|_| format!("invalid device index '{part}' in '{s}'"))?;
                if indices.contains(&index) {
                    return Err(format!("device {index} listed twice in '{s}'"));
                }
                indices.push(index);
            }
            if indices.is_empty() {
                return Err("empty device list".to_string());
            }
            Ok(Self::Indices(indices))
        } else {
            s.parse().map(Self::Count).map_err(|_| {
                format!(
                    "invalid gpus '{s}'. Use a device count (e.g. 2) \
                     or comma-separated device indices (e.g. 0,2)"
                )
            })
        }
    }
}

impl std::fmt::Display for GpuSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::Indices(indices) if indices.len() == 1 => write!(f, "{},", indices[0]),
            Self::Indices(indices) => {
                let joined: Vec<String> = indices.iter().map(ToString::to_string).collect();
                write!(f, "{}", joined.join(","))
            }
        }
    }
}

impl Serialize for GpuSpec {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for GpuSpec {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// An on/off switch written as `0` or `1` on the command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Toggle(pub bool);

impl Toggle {
    #[must_use]
    pub fn is_on(self) -> bool {
        self.0
    }
}

impl From<bool> for Toggle {
    fn from(value: bool) -> Self {
        Self(value)
    }
}

impl std::str::FromStr for Toggle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0" => Ok(Self(false)),
            "1" => Ok(Self(true)),
            other => Err(format!("invalid choice '{other}' (choose from 0, 1)")),
        }
    }
}

impl std::fmt::Display for Toggle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", u8::from(self.0))
    }
}
