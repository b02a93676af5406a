use folio::core::config::AppConfig;
use folio::core::price::ResolvedPrice;
use folio::core::resolver::PriceResolver;
use folio::store::HoldingsStore;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::info;

// Adds automatic logging to test
mod test_utils {
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_coingecko_mock_server(ids: &str, mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .and(query_param("ids", ids))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    /// Serves `{"c": price}` for each listing symbol; anything else is a 404.
    pub async fn create_finnhub_mock_server(quotes: &[(&str, f64)]) -> MockServer {
        let mock_server = MockServer::start().await;

        for (listing, price) in quotes {
            Mock::given(method("GET"))
                .and(path("/quote"))
                .and(query_param("symbol", *listing))
                .and(header("X-Finnhub-Token", "test-token"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_string(format!(r#"{{"c": {price}}}"#)),
                )
                .mount(&mock_server)
                .await;
        }

        mock_server
    }
}

struct TestApp {
    _dir: TempDir,
    config_path: PathBuf,
    data_path: PathBuf,
}

impl TestApp {
    fn new(coingecko_url: &str, finnhub_url: &str) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let data_path = dir.path().join("data");
        let config_path = dir.path().join("config.yaml");

        let config_content = format!(
            r#"
currency: "CAD"
providers:
  timeout_secs: 5
  coingecko:
    base_url: "{coingecko_url}"
  finnhub:
    base_url: "{finnhub_url}"
    api_key: "test-token"
fallback_prices:
  DOL: 130.0
  XEQT: 30.0
data_path: "{}"
"#,
            data_path.display()
        );
        fs::write(&config_path, config_content).expect("Failed to write config file");

        TestApp {
            _dir: dir,
            config_path,
            data_path,
        }
    }

    fn config_path(&self) -> &str {
        self.config_path.to_str().unwrap()
    }

    fn store(&self) -> HoldingsStore {
        HoldingsStore::new(self.data_path.join("holdings.yaml"))
    }

    fn write_csv(&self, name: &str, content: &str) -> String {
        let path = self.data_path.parent().unwrap().join(name);
        fs::write(&path, content).expect("Failed to write CSV file");
        path.to_str().unwrap().to_string()
    }

    async fn run(&self, command: folio::AppCommand) -> anyhow::Result<()> {
        folio::run_command(command, Some(self.config_path())).await
    }
}

const HOLDINGS_CSV: &str = "\
symbol,type,quantity,costBasisPerUnit,currency,exchange
BTC,Crypto,0.5,40000,CAD,
AAPL,Stock,10,150,USD,NASDAQ
DOL,Stock,10,120,CAD,TSX
XEQT,ETF,100,25,CAD,TSX
";

#[test_log::test(tokio::test)]
async fn test_resolution_against_mock_providers() {
    let coingecko =
        test_utils::create_coingecko_mock_server("bitcoin", r#"{"bitcoin": {"cad": 85000.5}}"#)
            .await;
    let finnhub = test_utils::create_finnhub_mock_server(&[("AAPL", 190.25), ("DOL.TO", 131.5)])
        .await;
    let app = TestApp::new(&coingecko.uri(), &finnhub.uri());

    let config = AppConfig::load_from_path(&app.config_path).unwrap();
    let resolver = PriceResolver::from_config(&config).unwrap();
    let prices = resolver
        .resolve(&["btc", "AAPL", "DOL", "XEQT", "NOPE"], &config.currency)
        .await;
    info!(?prices, "Resolved prices");

    assert_eq!(prices.len(), 5);
    assert_eq!(prices.get("BTC"), Some(ResolvedPrice::Live(85000.5)));
    assert_eq!(prices.get("AAPL"), Some(ResolvedPrice::Live(190.25)));
    assert_eq!(prices.get("DOL"), Some(ResolvedPrice::Live(131.5)));
    // XEQT.TO is not served by the mock, so the fallback applies.
    assert_eq!(prices.get("XEQT"), Some(ResolvedPrice::Fallback(30.0)));
    assert_eq!(prices.get("NOPE"), Some(ResolvedPrice::Unknown));
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_with_mock() {
    let coingecko =
        test_utils::create_coingecko_mock_server("bitcoin", r#"{"bitcoin": {"cad": 85000.5}}"#)
            .await;
    let finnhub = test_utils::create_finnhub_mock_server(&[("AAPL", 190.25)]).await;
    let app = TestApp::new(&coingecko.uri(), &finnhub.uri());

    let csv_path = app.write_csv("holdings.csv", HOLDINGS_CSV);
    app.run(folio::AppCommand::Import {
        path: csv_path,
        append: false,
    })
    .await
    .expect("Import failed");
    assert_eq!(app.store().load().unwrap().len(), 4);

    for command in [folio::AppCommand::Summary, folio::AppCommand::Prices] {
        let result = app.run(command).await;
        assert!(
            result.is_ok(),
            "Command failed with: {:?}",
            result.err()
        );
    }

    let result = app
        .run(folio::AppCommand::Resolve {
            request: Some(r#"{"symbols": ["BTC", "DOL"], "baseCurrency": "CAD"}"#.to_string()),
        })
        .await;
    assert!(result.is_ok(), "Resolve failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_summary_without_holdings() {
    let app = TestApp::new("http://127.0.0.1:9", "http://127.0.0.1:9");
    let result = app.run(folio::AppCommand::Summary).await;
    assert!(result.is_ok(), "Summary failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_export_import_round_trip() {
    let app = TestApp::new("http://127.0.0.1:9", "http://127.0.0.1:9");
    let csv_path = app.write_csv("holdings.csv", HOLDINGS_CSV);
    app.run(folio::AppCommand::Import {
        path: csv_path,
        append: false,
    })
    .await
    .unwrap();
    let original = app.store().load().unwrap();

    let export_path = app.data_path.parent().unwrap().join("export.csv");
    app.run(folio::AppCommand::Export {
        path: Some(export_path.to_str().unwrap().to_string()),
    })
    .await
    .unwrap();

    app.run(folio::AppCommand::Import {
        path: export_path.to_str().unwrap().to_string(),
        append: false,
    })
    .await
    .unwrap();
    let reimported = app.store().load().unwrap();

    assert_eq!(reimported.len(), original.len());
    for (before, after) in original.iter().zip(&reimported) {
        assert!(before.same_position(after), "{before:?} != {after:?}");
        assert_ne!(before.id, after.id);
    }
}

#[test_log::test(tokio::test)]
async fn test_rejected_import_leaves_holdings_untouched() {
    let app = TestApp::new("http://127.0.0.1:9", "http://127.0.0.1:9");
    app.run(folio::AppCommand::Add(folio::NewHolding {
        symbol: "shop".to_string(),
        instrument_type: folio::core::holding::InstrumentType::Stock,
        quantity: 4.0,
        cost_basis_per_unit: 80.0,
        currency: None,
        exchange: None,
    }))
    .await
    .unwrap();
    let before = app.store().load().unwrap();

    let bad_csv = app.write_csv(
        "bad.csv",
        "symbol,type,quantity,costBasisPerUnit\nBTC,Crypto,1,1\nETH,Crypto,abc,1\n",
    );
    let result = app
        .run(folio::AppCommand::Import {
            path: bad_csv,
            append: true,
        })
        .await;

    assert!(result.is_err());
    assert_eq!(app.store().load().unwrap(), before);
    assert!(Path::new(&app.data_path.join("holdings.yaml")).exists());
}

#[test_log::test(tokio::test)]
async fn test_missing_config_file_fails() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.yaml");
    let result = folio::run_command(folio::AppCommand::Summary, missing.to_str()).await;

    let err = result.unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}
