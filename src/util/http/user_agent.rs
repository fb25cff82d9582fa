use rand::Rng;

const CHROME_VERSIONS: [&str; 8] = [
    "141.0.7390.108",
    "141.0.7390.76",
    "140.0.7339.207",
    "140.0.7339.128",
    "139.0.7258.155",
    "139.0.7258.128",
    "138.0.7204.184",
    "138.0.7204.158",
];

const FIREFOX_VERSIONS: [&str; 6] = ["144.0", "143.0", "142.0", "141.0", "140.0", "139.0"];

const SAFARI_VERSIONS: [&str; 4] = ["26.0", "18.6", "18.5", "18.4"];

const DESKTOP_OS: [&str; 6] = [
    "Windows NT 10.0; Win64; x64",
    "Windows NT 11.0; Win64; x64",
    "Macintosh; Intel Mac OS X 10_15_7",
    "Macintosh; Intel Mac OS X 14_6_1",
    "X11; Linux x86_64",
    "X11; Ubuntu; Linux x86_64",
];

// スマホ版ページ(sp/)を見るのでモバイルも混ぜる
const IPHONE_OS: [&str; 4] = [
    "iPhone; CPU iPhone OS 18_6 like Mac OS X",
    "iPhone; CPU iPhone OS 18_5 like Mac OS X",
    "iPhone; CPU iPhone OS 17_7 like Mac OS X",
    "iPad; CPU OS 18_6 like Mac OS X",
];

fn gen_chrome_ua() -> String {
    let mut rng = rand::rng();
    let version = CHROME_VERSIONS[rng.random_range(0..CHROME_VERSIONS.len())];
    let os = DESKTOP_OS[rng.random_range(0..DESKTOP_OS.len())];
    format!(
        "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{} Safari/537.36",
        os, version
    )
}

fn gen_firefox_ua() -> String {
    let mut rng = rand::rng();
    let version = FIREFOX_VERSIONS[rng.random_range(0..FIREFOX_VERSIONS.len())];
    let os = DESKTOP_OS[rng.random_range(0..DESKTOP_OS.len())];
    format!(
        "Mozilla/5.0 ({}; rv:{}) Gecko/20100101 Firefox/{}",
        os, version, version
    )
}

fn gen_safari_mobile_ua() -> String {
    let mut rng = rand::rng();
    let version = SAFARI_VERSIONS[rng.random_range(0..SAFARI_VERSIONS.len())];
    let os = IPHONE_OS[rng.random_range(0..IPHONE_OS.len())];
    format!(
        "Mozilla/5.0 ({}) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/{} Mobile/15E148 Safari/604.1",
        os, version
    )
}

/// Returns a browser user agent picked at random, weighted toward Chrome.
pub fn gen_random_ua() -> String {
    let mut rng = rand::rng();
    match rng.random_range(0..10) {
        0..=4 => gen_chrome_ua(),
        5..=6 => gen_firefox_ua(),
        _ => gen_safari_mobile_ua(),
    }
}
