use anyhow::Context;

fn main() -> anyhow::Result<()> {
    nestview::run().context("nestview failed")
}
