use docidx_core::Error;

/// Vector engines this build knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorEngineKind {
    /// Exact dot-product scan over a LanceDB table.
    LanceFlatIp,
}

impl VectorEngineKind {
    pub const ALL: [VectorEngineKind; 1] = [VectorEngineKind::LanceFlatIp];

    pub const fn name(self) -> &'static str {
        match self {
            VectorEngineKind::LanceFlatIp => "lance-flat-ip",
        }
    }

    /// Maps a configured engine name to an available engine.
    pub fn resolve(name: &str) -> Result<Self, Error> {
        let wanted = name.trim();
        Self::ALL.into_iter().find(|kind| kind.name().eq_ignore_ascii_case(wanted)).ok_or_else(|| {
            let known: Vec<&str> = Self::ALL.iter().map(|k| k.name()).collect();
            Error::EngineUnavailable(format!("'{}' is not available (known: {})", wanted, known.join(", ")))
        })
    }
}
