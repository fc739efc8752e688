/// Known synthetic indices and their display labels.
const KNOWN_INSTRUMENTS: &[(&str, &str)] = &[
    ("R_10", "Volatility 10 Index"),
    ("R_25", "Volatility 25 Index"),
    ("R_50", "Volatility 50 Index"),
    ("R_75", "Volatility 75 Index"),
    ("R_100", "Volatility 100 Index"),
    ("1HZ10V", "Volatility 10 (1s) Index"),
    ("1HZ25V", "Volatility 25 (1s) Index"),
    ("1HZ50V", "Volatility 50 (1s) Index"),
    ("1HZ75V", "Volatility 75 (1s) Index"),
    ("1HZ100V", "Volatility 100 (1s) Index"),
    ("BOOM500", "Boom 500 Index"),
    ("BOOM1000", "Boom 1000 Index"),
    ("CRASH500", "Crash 500 Index"),
    ("CRASH1000", "Crash 1000 Index"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    pub symbol: String,
    pub label: String,
}

/// Selectable instruments, in configured order. The feed treats symbols as
/// opaque keys; the catalog only gates what the shell accepts.
#[derive(Debug, Clone)]
pub struct InstrumentCatalog {
    instruments: Vec<Instrument>,
}

impl InstrumentCatalog {
    pub fn from_symbols(symbols: &[String]) -> Self {
        let instruments = symbols
            .iter()
            .map(|symbol| Instrument {
                label: label_for(symbol).unwrap_or(symbol.as_str()).to_string(),
                symbol: symbol.clone(),
            })
            .collect();
        Self { instruments }
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    /// Case-insensitive lookup; returns the canonical symbol.
    pub fn resolve(&self, input: &str) -> Option<&Instrument> {
        let needle = input.trim();
        self.instruments
            .iter()
            .find(|i| i.symbol.eq_ignore_ascii_case(needle))
    }
}

pub fn label_for(symbol: &str) -> Option<&'static str> {
    KNOWN_INSTRUMENTS
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|(_, label)| *label)
}
