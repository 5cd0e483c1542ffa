use reqpilot::error::AppResult;

fn main() -> AppResult<()> {
    reqpilot::run()
}
