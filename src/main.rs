fn main() -> anyhow::Result<()> {
    hazardwatch_lib::run()
}
