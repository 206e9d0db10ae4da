const CONSUL_HTTP_ADDR: &str = "CONSUL_HTTP_ADDR";

const DEFAULT_CONSUL_ADDR: &str = "http://127.0.0.1:8500";

pub fn get_consul_addr() -> String {
    let addr_from_env = std::env::var(CONSUL_HTTP_ADDR);
    addr_from_env.map_or(DEFAULT_CONSUL_ADDR.to_string(), |addr| {
        if addr.starts_with("http://") || addr.starts_with("https://") {
            addr
        } else {
            format!("http://{addr}")
        }
    })
}

const CONSUL_HTTP_TOKEN: &str = "CONSUL_HTTP_TOKEN";

pub fn get_consul_token() -> Option<String> {
    let token_from_env = std::env::var(CONSUL_HTTP_TOKEN);
    token_from_env.ok().filter(|token| !token.is_empty())
}
