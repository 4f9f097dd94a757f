// tests/normalize_idempotence.rs
//
// normalize(normalize(x)) == normalize(x) for every catalog rule.

use parts_price_matcher::Catalog;

const SAMPLES: &[&str] = &[
    "Процесор Intel i5-10400",
    "Процесор Intel (BOX) Xeon Gold 6230 (tray)",
    "Оперативна пам'ять DDR4 (16GB 3200MHz)",
    "оперативна пам'ять ddr5",
    "Диск NVMe (Samsung 980 PRO 1TB)",
    "Жорсткий диск (Seagate Exos 8TB) SAS",
    "Накопичувач SSD (Kingston (A400) 480GB)",
    "Відеокарта RTX 4070 (12GB)",
    "ВІДЕОКАРТА   rtx 3060",
    "Робоча станція HP Z4 G4 (Xeon W-2133)",
    "Сервер Dell PowerEdge R740  ",
    "HPE 16GB (1x16GB) Dual Rank x8 DDR4-2666 (835955-B21)",
    "()",
    "   ",
    "",
];

#[test]
fn every_catalog_rule_is_idempotent() {
    for catalog in Catalog::ALL {
        let rule = catalog.default_policy().normalization;
        for s in SAMPLES {
            let once = rule.normalize(s);
            let twice = rule.normalize(&once);
            assert_eq!(twice, once, "{} on {s:?}", catalog.name());
        }
    }
}

#[test]
fn category_key_is_stable_under_normalization() {
    // Spaceless catalogs classify the normalized term exactly like the raw one.
    for catalog in [Catalog::Prom, Catalog::Servak, Catalog::Kyivtech] {
        let policy = catalog.default_policy();
        for s in SAMPLES {
            let raw = policy.query(s);
            let again = policy.query(&raw.search_term);
            assert_eq!(again.threshold, raw.threshold, "{} on {s:?}", catalog.name());
        }
    }
}
