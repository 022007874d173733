//! The Longley economic dataset.
//!
//! Sixteen yearly observations (1947-1962) of US macroeconomic series. The
//! predictors are highly collinear, which makes it a standard stress test for
//! least-squares code. Target: total employment (`Employed`, millions).

use super::dataset::Dataset;

/// Predictor column names
pub const LONGLEY_FEATURES: [&str; 6] = [
    "GNP.deflator",
    "GNP",
    "Unemployed",
    "Armed.Forces",
    "Population",
    "Year",
];

/// Target column name
pub const LONGLEY_TARGET: &str = "Employed";

/// GNP.deflator, GNP, Unemployed, Armed.Forces, Population, Year, Employed
const LONGLEY_ROWS: [[f64; 7]; 16] = [
    [83.0, 234.289, 235.6, 159.0, 107.608, 1947.0, 60.323],
    [88.5, 259.426, 232.5, 145.6, 108.632, 1948.0, 61.122],
    [88.2, 258.054, 368.2, 161.6, 109.773, 1949.0, 60.171],
    [89.5, 284.599, 335.1, 165.0, 110.929, 1950.0, 61.187],
    [96.2, 328.975, 209.9, 309.9, 112.075, 1951.0, 63.221],
    [98.1, 346.999, 193.2, 359.4, 113.270, 1952.0, 63.639],
    [99.0, 365.385, 187.0, 354.7, 115.094, 1953.0, 64.989],
    [100.0, 363.112, 357.8, 335.0, 116.219, 1954.0, 63.761],
    [101.2, 397.469, 290.4, 304.8, 117.388, 1955.0, 66.019],
    [104.6, 419.180, 282.2, 285.7, 118.734, 1956.0, 67.857],
    [108.4, 442.769, 293.6, 279.8, 120.445, 1957.0, 68.169],
    [110.8, 444.546, 468.1, 263.7, 121.950, 1958.0, 66.513],
    [112.6, 482.704, 381.3, 255.2, 123.366, 1959.0, 68.655],
    [114.2, 502.601, 393.1, 251.4, 125.368, 1960.0, 69.564],
    [115.7, 518.173, 480.6, 257.2, 127.852, 1961.0, 69.331],
    [116.9, 554.894, 400.7, 282.7, 130.081, 1962.0, 70.551],
];

/// Build the Longley dataset (16 rows, 6 predictors, `Employed` target)
pub fn longley() -> Dataset {
    Dataset {
        features: LONGLEY_ROWS.iter().map(|row| row[..6].to_vec()).collect(),
        targets: LONGLEY_ROWS.iter().map(|row| row[6]).collect(),
        feature_names: LONGLEY_FEATURES.iter().map(|s| s.to_string()).collect(),
        target_name: LONGLEY_TARGET.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longley_shape() {
        let data = longley();
        assert_eq!(data.n_samples(), 16);
        assert_eq!(data.n_features(), 6);
        assert_eq!(data.target_name, "Employed");
        assert_eq!(data.features[0][5], 1947.0);
        assert_eq!(data.features[15][5], 1962.0);
        assert_eq!(data.target_range(), Some((60.171, 70.551)));
    }
}
