use clap::Parser;

use rufuzzion::params::Parameters;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let params = match Parameters::try_parse() {
        Ok(params) => params,
        Err(e) => {
            // clap renders usage; every usage problem exits 1
            let _ = e.print();
            std::process::exit(1);
        }
    };

    if let Err(err) = rufuzzion::run(&params) {
        eprintln!("rufuzzion: {err}");
        std::process::exit(1);
    }
}
