use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn medstock_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("medstock");
    path
}

const STOCK_CSV: &str = "\
CODE1,NAME1,CONTENT,TYPE,Amount1,minofLotPack,price,ExpDate,TradeName,LotNo
1000317,Amoxycillin,500 mg,cap,33,500,,31/12/2026,,
2000001,Zinc sulfate,20 mg,tab,10,100,\"1,250.00\",2020-01-15,Zincovit,L-77
3000002,Paracetamol,500 mg,tab,120,1000,n/a,sometime,Tylenol,B12
";

/// Inline-string cell.
fn s(col: &str, text: &str) -> String {
    format!("<c r=\"{}\" t=\"inlineStr\"><is><t>{}</t></is></c>", col, text)
}

/// Numeric cell.
fn n(col: &str, value: f64) -> String {
    format!("<c r=\"{}\"><v>{}</v></c>", col, value)
}

fn stock_xlsx() -> Vec<u8> {
    let header = ["CODE1", "NAME1", "CONTENT", "TYPE", "Amount1", "minofLotPack", "price", "ExpDate"];
    let cols = ["A", "B", "C", "D", "E", "F", "G", "H"];
    let mut rows = String::from("<row r=\"1\">");
    for (c, h) in cols.iter().zip(header) {
        rows.push_str(&s(&format!("{}1", c), h));
    }
    rows.push_str("</row><row r=\"2\">");
    rows.push_str(&n("A2", 1000317.0));
    rows.push_str(&s("B2", "Amoxycillin"));
    rows.push_str(&s("C2", "500 mg"));
    rows.push_str(&s("D2", "cap"));
    rows.push_str(&n("E2", 33.0));
    rows.push_str(&n("F2", 500.0));
    rows.push_str(&n("H2", 46387.0));
    rows.push_str("</row>");

    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        let opts = zip::write::SimpleFileOptions::default();
        zip.start_file("xl/worksheets/sheet1.xml", opts).unwrap();
        zip.write_all(
            format!(
                "<?xml version=\"1.0\"?><worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\"><sheetData>{}</sheetData></worksheet>",
                rows
            )
            .as_bytes(),
        )
        .unwrap();
        zip.finish().unwrap();
    }
    buf
}

fn setup_test_env(password: Option<&str>) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();
    fs::write(data_dir.join("stock.csv"), STOCK_CSV).unwrap();

    let mut config_content = format!(
        r#"[dataset]
path = "{}/data/stock.csv"

[display]
limit = 2
"#,
        root.display()
    );
    if let Some(pw) = password {
        config_content.push_str(&format!("\n[admin]\npassword = \"{}\"\n", pw));
    }

    let config_path = config_dir.join("medstock.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_medstock(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = medstock_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("MEDSTOCK_ADMIN_PASSWORD")
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run medstock binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_check_reports_columns_and_warnings() {
    let (_tmp, config) = setup_test_env(None);
    let (stdout, _stderr, success) = run_medstock(&config, &["check"]);
    assert!(success, "check failed");
    assert!(stdout.contains("Rows:         3"), "{}", stdout);
    assert!(stdout.contains("amount      <- \"Amount1\" (column 5)"), "{}", stdout);
    assert!(stdout.contains("report_date <- (absent, no report date)"), "{}", stdout);
    assert!(stdout.contains("Warnings: 2"), "{}", stdout);
    assert!(stdout.contains("row 3: price value \"n/a\" is not a number"), "{}", stdout);
    assert!(stdout.contains("row 3: expiry value \"sometime\" is not a date"), "{}", stdout);
}

#[test]
fn test_check_missing_columns_fails() {
    let (tmp, config) = setup_test_env(None);
    let bad = tmp.path().join("bad.csv");
    fs::write(&bad, "CODE1,NAME1,minofLotPack\n1,Zinc,10\n").unwrap();

    let (_stdout, stderr, success) = run_medstock(&config, &["check", bad.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("missing required column(s): amount"), "{}", stderr);
}

#[test]
fn test_search_amoxycillin_card() {
    let (_tmp, config) = setup_test_env(None);
    let (stdout, _stderr, success) = run_medstock(&config, &["search", "500 mg"]);
    assert!(success);
    assert!(stdout.contains("Results: 2 items"), "{}", stdout);
    assert!(stdout.contains("Amoxycillin 500 mg cap"));
    assert!(stdout.contains("EXP 31/12/2026"));
    assert!(stdout.contains("Code: 1000317 | Trade name: -"));
    assert!(stdout.contains("Qty: 33 x 500 | Price: 0.00 | Lot: -"));
}

#[test]
fn test_search_no_match_and_no_data() {
    let (tmp, config) = setup_test_env(None);
    let (stdout, _, success) = run_medstock(&config, &["search", "999"]);
    assert!(success);
    assert!(stdout.contains("No results."));

    fs::remove_file(tmp.path().join("data/stock.csv")).unwrap();
    let (stdout, _, success) = run_medstock(&config, &["search", "999"]);
    assert!(success);
    assert!(stdout.contains("No data available"), "{}", stdout);
}

#[test]
fn test_search_truncates_to_limit() {
    let (_tmp, config) = setup_test_env(None);
    let (stdout, _, success) = run_medstock(&config, &["search"]);
    assert!(success);
    assert!(stdout.contains("Results: 3 items"));
    assert!(stdout.contains("showing first 2"));
    assert!(!stdout.contains("Paracetamol"));
}

#[test]
fn test_search_json() {
    let (_tmp, config) = setup_test_env(None);
    let (stdout, _, success) = run_medstock(&config, &["search", "ZINC", "--json"]);
    assert!(success);
    let items: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let items = items.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["code"], "2000001");
    assert_eq!(items[0]["price"], 1250.0);
    assert_eq!(items[0]["price_display"], "1,250.00");
    assert_eq!(items[0]["expiry_status"], "expired");
    assert_eq!(items[0]["lot_no"], "L-77");
}

#[test]
fn test_search_xlsx_without_config() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("stock.xlsx");
    fs::write(&file, stock_xlsx()).unwrap();
    let missing_config = tmp.path().join("none.toml");

    let (stdout, _, success) = run_medstock(
        &missing_config,
        &["search", "amoxy", "--file", file.to_str().unwrap()],
    );
    assert!(success);
    assert!(stdout.contains("Amoxycillin 500 mg cap"), "{}", stdout);
    assert!(stdout.contains("Code: 1000317"));
    assert!(stdout.contains("Qty: 33 x 500"));
    assert!(stdout.contains("EXP 31/12/2026"));
}

#[test]
fn test_stats() {
    let (_tmp, config) = setup_test_env(None);
    let (stdout, _, success) = run_medstock(&config, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Rows:         3"), "{}", stdout);
    assert!(stdout.contains("Expired:      1"));
    assert!(stdout.contains("No expiry:    1"));
    assert!(stdout.contains("Price total:  1,250.00"));
}

#[test]
fn test_update_gate() {
    let (tmp, config) = setup_test_env(None);
    let upload = tmp.path().join("new.csv");
    fs::write(&upload, "CODE1,NAME1,Amount1,minofLotPack\n9,Iron,1,30\n").unwrap();

    let (_, stderr, success) = run_medstock(
        &config,
        &["update", upload.to_str().unwrap(), "--password", "x"],
    );
    assert!(!success);
    assert!(stderr.contains("disabled"), "{}", stderr);
}

#[test]
fn test_update_replaces_dataset() {
    let (tmp, config) = setup_test_env(Some("secret"));
    let upload = tmp.path().join("new.csv");
    fs::write(&upload, "CODE1,NAME1,Amount1,minofLotPack\n9,Iron,1,30\n").unwrap();
    let path = upload.to_str().unwrap();

    let (_, stderr, success) = run_medstock(&config, &["update", path, "--password", "wrong"]);
    assert!(!success);
    assert!(stderr.contains("incorrect admin password"), "{}", stderr);

    let (stdout, _, success) = run_medstock(&config, &["update", path, "--password", "secret"]);
    assert!(success);
    assert!(stdout.starts_with("updated:"), "{}", stdout);

    let (stdout, _, success) = run_medstock(&config, &["update", path, "--password", "secret"]);
    assert!(success);
    assert!(stdout.starts_with("unchanged:"), "{}", stdout);

    let (stdout, _, _) = run_medstock(&config, &["search", "iron"]);
    assert!(stdout.contains("Results: 1 items"));
}
