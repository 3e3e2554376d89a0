fn main() -> anyhow::Result<()> {
    forgefit_lib::run()
}
