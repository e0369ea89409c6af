use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Buy,
    Hold,
    Sell,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Buy => "buy",
            Signal::Hold => "hold",
            Signal::Sell => "sell",
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
