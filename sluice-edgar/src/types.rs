use serde::{Deserialize, Serialize};

/// One entry of the `/mapping/ticker/{TICKER}` response array.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MappingRecord {
    #[serde(default)]
    pub cik: Option<Cik>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub cusip: Option<String>,
    #[serde(default)]
    pub exchange: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// The API sends the CIK as either a string or a bare number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Cik {
    Text(String),
    Number(u64),
}

impl Cik {
    /// Zero-padded to the canonical 10 digits.
    pub fn padded(&self) -> String {
        match self {
            Cik::Text(s) => format!("{:0>10}", s.trim()),
            Cik::Number(n) => format!("{:010}", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyData {
    /// 10 digits, or empty when the API has no mapping for the ticker.
    pub cik: String,
    pub name: String,
    pub ticker: String,
    pub description: Option<String>,
    pub website: Option<String>,
    pub sic_description: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl CompanyData {
    /// Stand-in for a ticker the mapping API returned nothing for.
    pub fn placeholder(ticker: &str) -> Self {
        let ticker = ticker.to_uppercase();
        Self {
            cik: String::new(),
            name: ticker.clone(),
            description: Some(format!("{} Corporation", ticker)),
            ticker,
            website: None,
            sic_description: None,
            phone: None,
            address: None,
        }
    }

    pub fn from_record(ticker: &str, record: MappingRecord) -> Self {
        let ticker = ticker.to_uppercase();
        let name = record
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| ticker.clone());
        let description = record.description.filter(|d| !d.is_empty()).or_else(|| {
            record
                .sector
                .as_ref()
                .map(|sector| format!("{} - {} company", name, sector))
        });

        Self {
            cik: record.cik.map(|c| c.padded()).unwrap_or_default(),
            name,
            ticker,
            description,
            website: record.website,
            sic_description: record.industry.or(record.sector),
            phone: record.phone,
            address: record.address,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.cik.is_empty()
    }
}
