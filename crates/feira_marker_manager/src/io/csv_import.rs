use std::{collections::HashMap, io::Read, path::Path};

use feira_marker_models::{Coords, Marker, MarkerKind};
use miette::{IntoDiagnostic, Result, WrapErr};
use tracing::{debug, info, warn};

pub const COLUMN_KIND: &str = "tipo";
pub const COLUMN_LAT: &str = "lat";
pub const COLUMN_LNG: &str = "long";
pub const COLUMN_PRODUCTS: &str = "produtos";
pub const COLUMN_QUANTITY: &str = "quantidade";

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

#[derive(Debug, Default)]
pub struct ImportReport {
    pub markers: Vec<Marker>,
    /// rows that could not be read (not utf-8), they are logged and dropped
    pub skipped: usize,
}

pub fn import_markers_from_path(path: &Path) -> Result<ImportReport> {
    info!(?path, "importing markers");
    let file = std::fs::File::open(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to open {}", path.display()))?;
    import_markers_from_reader(file)
        .wrap_err_with(|| format!("failed to import {}", path.display()))
}

pub fn import_markers_from_reader(mut input: impl Read) -> Result<ImportReport> {
    let mut raw = Vec::new();
    input
        .read_to_end(&mut raw)
        .into_diagnostic()
        .wrap_err("failed to read marker file")?;
    let raw = raw.strip_prefix(UTF8_BOM).unwrap_or(raw.as_slice());

    let delimiter = detect_delimiter(raw);
    let decimal_comma = delimiter == b';';
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(raw);

    let columns: HashMap<String, usize> = reader
        .headers()
        .into_diagnostic()
        .wrap_err("failed to read the header row")?
        .iter()
        .enumerate()
        .map(|(i, name)| (name.trim().to_lowercase(), i))
        .collect();
    debug!(?columns, delimiter = %(delimiter as char), "marker file header");

    let mut report = ImportReport::default();
    for (row, record) in reader.records().enumerate() {
        match record {
            Ok(record) => {
                let field = |name: &str| columns.get(name).and_then(|&i| record.get(i));
                report.markers.push(Marker {
                    kind: field(COLUMN_KIND).unwrap_or_default().parse().unwrap_or_default(),
                    coords: Coords::new(
                        parse_coordinate(field(COLUMN_LAT), decimal_comma),
                        parse_coordinate(field(COLUMN_LNG), decimal_comma),
                    ),
                    frutas: split_products(field(COLUMN_PRODUCTS)),
                    quantidade: parse_quantity(field(COLUMN_QUANTITY), decimal_comma),
                });
            }
            Err(e) => {
                // +2: one for the header, one because rows are counted from 1 in editors
                warn!(?e, line = row + 2, "skipping unreadable marker row");
                report.skipped += 1;
            }
        }
    }
    info!(
        "imported {} markers, skipped {} rows",
        report.markers.len(),
        report.skipped
    );
    Ok(report)
}

fn detect_delimiter(raw: &[u8]) -> u8 {
    let header = raw.split(|&b| b == b'\n').next().unwrap_or_default();
    if header.contains(&b';') && !header.contains(&b',') {
        b';'
    } else {
        b','
    }
}

fn normalize_number(value: &str, decimal_comma: bool) -> String {
    if decimal_comma {
        value.trim().replace(',', ".")
    } else {
        value.trim().to_string()
    }
}

fn parse_coordinate(value: Option<&str>, decimal_comma: bool) -> f64 {
    value
        .map(|v| normalize_number(v, decimal_comma))
        .and_then(|v| v.parse().ok())
        .unwrap_or(f64::NAN)
}

fn parse_quantity(value: Option<&str>, decimal_comma: bool) -> i64 {
    let Some(value) = value.map(|v| normalize_number(v, decimal_comma)) else {
        return 0;
    };
    if let Ok(q) = value.parse::<i64>() {
        return q;
    }
    match value.parse::<f64>() {
        Ok(q) if q.is_finite() => q.trunc() as i64,
        _ => 0,
    }
}

fn split_products(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    fn import(raw: &str) -> ImportReport {
        import_markers_from_reader(raw.as_bytes()).unwrap()
    }

    #[test]
    fn valid_rows() {
        let raw = "tipo,lat,long,produtos,quantidade\n\
                   produtor,-23.5,-46.6,\"Manga, Uva\",10\n\
                   mercado,-23.55,-46.65,Banana,8\n";
        let report = import(raw);
        assert_eq!(report.skipped, 0);
        similar_asserts::assert_eq!(
            report.markers,
            vec![
                Marker {
                    kind: MarkerKind::Produtor,
                    coords: Coords::new(-23.5, -46.6),
                    frutas: vec!["Manga".to_string(), "Uva".to_string()],
                    quantidade: 10,
                },
                Marker {
                    kind: MarkerKind::Mercado,
                    coords: Coords::new(-23.55, -46.65),
                    frutas: vec!["Banana".to_string()],
                    quantidade: 8,
                },
            ]
        );
    }

    #[rstest]
    #[case("produtor", MarkerKind::Produtor)]
    #[case("Producer", MarkerKind::Produtor)]
    #[case("mercado", MarkerKind::Mercado)]
    #[case("atacadista", MarkerKind::Mercado)]
    #[case("", MarkerKind::Mercado)]
    fn kind_column(#[case] tipo: &str, #[case] expected: MarkerKind) {
        let raw = format!("tipo,lat,long,produtos,quantidade\n{tipo},1,2,,3\n");
        assert_eq!(import(&raw).markers[0].kind, expected);
    }

    #[test]
    fn missing_kind_column_defaults_to_market() {
        let report = import("lat,long\n1,2\n");
        assert_eq!(report.markers[0].kind, MarkerKind::Mercado);
        assert!(report.markers[0].frutas.is_empty());
        assert_eq!(report.markers[0].quantidade, 0);
    }

    #[test]
    fn malformed_numbers_fall_back() {
        let report = import("tipo,lat,long,produtos,quantidade\nprodutor,abc,,Uva,muito\n");
        let m = &report.markers[0];
        assert!(m.coords.lat.is_nan());
        assert!(m.coords.lng.is_nan());
        assert_eq!(m.quantidade, 0);
        assert_eq!(m.frutas, vec!["Uva".to_string()]);
    }

    #[test]
    fn decimal_quantity_is_truncated() {
        let report = import("tipo,lat,long,produtos,quantidade\nmercado,1,2,,7.9\n");
        assert_eq!(report.markers[0].quantidade, 7);
    }

    #[test]
    fn columns_in_any_order_and_case() {
        let report = import("Quantidade, LONG ,Tipo,Lat\n5,-46.6,produtor,-23.5\n");
        let m = &report.markers[0];
        assert_eq!(m.kind, MarkerKind::Produtor);
        assert_eq!(m.coords, Coords::new(-23.5, -46.6));
        assert_eq!(m.quantidade, 5);
    }

    #[test]
    fn semicolon_file_with_decimal_comma() {
        let raw = "tipo;lat;long;produtos;quantidade\nprodutor;-23,5;-46,6;Manga, Caju;12\n";
        let m = &import(raw).markers[0];
        assert_eq!(m.coords, Coords::new(-23.5, -46.6));
        assert_eq!(m.frutas, vec!["Manga".to_string(), "Caju".to_string()]);
        assert_eq!(m.quantidade, 12);
    }

    #[test]
    fn unreadable_row_does_not_block_the_rest() {
        let raw = b"tipo,lat,long,produtos,quantidade\nmercado,1,2,,3\n\xff\xfe,1,2,,3\nprodutor,3,4,,5\n";
        let report = import_markers_from_reader(&raw[..]).unwrap();
        assert_eq!(report.skipped, 1);
        let quantities: Vec<i64> = report.markers.iter().map(|m| m.quantidade).collect();
        assert_eq!(quantities, vec![3, 5]);
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        let raw = b"\xef\xbb\xbftipo,lat,long\nprodutor,1,2\n";
        let report = import_markers_from_reader(&raw[..]).unwrap();
        assert_eq!(report.markers[0].kind, MarkerKind::Produtor);
    }

    #[test]
    fn empty_file_has_no_markers() {
        let report = import("");
        assert!(report.markers.is_empty());
    }
}
