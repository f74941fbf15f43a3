use crate::Error;

/// How many frames to use as time origins when averaging a time correlation
/// function.
///
/// In JSON parameters, this is either an integer (a non-positive value meaning
/// all origins), the string `"all"`, or the string `"1"` to use a single time
/// origin without any averaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Deserialize, serde::Serialize)]
#[serde(try_from = "OriginsRepr", into = "OriginsRepr")]
pub enum Origins {
    /// Use every frame as a time origin
    All,
    /// Use approximately this many time origins, evenly spaced along the
    /// trajectory
    Count(usize),
    /// Use only the first frame as time origin
    Single,
}

impl Origins {
    /// Get the stride between consecutive time origins in a trajectory
    /// containing `n_frames` frames.
    pub fn stride(&self, n_frames: usize) -> usize {
        match *self {
            Origins::All => 1,
            Origins::Count(count) => usize::max(1, n_frames / count),
            Origins::Single => usize::max(1, n_frames),
        }
    }

    /// Should lags be allowed to start from frames other than the first one
    /// of a block? This is disabled when using a single origin.
    pub fn use_offsets(&self) -> bool {
        !matches!(self, Origins::Single)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(untagged)]
enum OriginsRepr {
    Number(i64),
    Text(String),
}

impl TryFrom<OriginsRepr> for Origins {
    type Error = Error;

    fn try_from(value: OriginsRepr) -> Result<Origins, Error> {
        match value {
            OriginsRepr::Number(count) if count <= 0 => Ok(Origins::All),
            OriginsRepr::Number(count) => Ok(Origins::Count(count as usize)),
            OriginsRepr::Text(text) => match text.as_str() {
                "all" => Ok(Origins::All),
                "1" => Ok(Origins::Single),
                _ => Err(Error::InvalidParameter(format!(
                    "expected an integer, \"all\" or \"1\" for the number of origins, got \"{}\"",
                    text
                ))),
            },
        }
    }
}

impl From<Origins> for OriginsRepr {
    fn from(value: Origins) -> OriginsRepr {
        match value {
            Origins::All => OriginsRepr::Number(-1),
            Origins::Count(count) => OriginsRepr::Number(count as i64),
            Origins::Single => OriginsRepr::Text("1".into()),
        }
    }
}

impl schemars::JsonSchema for Origins {
    fn schema_name() -> String {
        "Origins".into()
    }

    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        <OriginsRepr as schemars::JsonSchema>::json_schema(gen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride() {
        assert_eq!(Origins::All.stride(100), 1);
        assert_eq!(Origins::Count(50).stride(100), 2);
        assert_eq!(Origins::Count(30).stride(100), 3);
        assert_eq!(Origins::Count(500).stride(100), 1);
        assert_eq!(Origins::Single.stride(100), 100);

        assert!(Origins::All.use_offsets());
        assert!(Origins::Count(3).use_offsets());
        assert!(!Origins::Single.use_offsets());
    }

    #[test]
    fn json() {
        let parse = |json| serde_json::from_str::<Origins>(json);
        assert_eq!(parse("-1").unwrap(), Origins::All);
        assert_eq!(parse("0").unwrap(), Origins::All);
        assert_eq!(parse("\"all\"").unwrap(), Origins::All);
        assert_eq!(parse("50").unwrap(), Origins::Count(50));
        assert_eq!(parse("\"1\"").unwrap(), Origins::Single);
        assert!(parse("\"many\"").is_err());

        assert_eq!(serde_json::to_string(&Origins::Single).unwrap(), "\"1\"");
        assert_eq!(serde_json::to_string(&Origins::Count(8)).unwrap(), "8");
    }
}
