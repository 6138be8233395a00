use log::error;
use yc_discover::{get_addresses, yandex::YandexProvider, Provider, SupportedProvider};

const GLOBAL_HELP: &str = "The options for discovering ip addresses are provided as
\"key=value key=value ...\" arguments.

  yc-discover addrs provider=yandex-cloud folder_id=b1g0000 instance_group_name=consul

The options are provider specific and are listed below.
";

pub fn help(provider: Option<&str>) {
    println!("{}", GLOBAL_HELP);
    match provider.map(str::parse::<SupportedProvider>) {
        Some(Err(e)) => {
            println!("{}\n", e);
            println!("{}", YandexProvider::help());
        }
        Some(Ok(SupportedProvider::YandexCloud)) | None => {
            println!("{}", YandexProvider::help());
        }
    }
}

async fn get_addrs(args: Vec<String>) -> bool {
    let res = get_addresses(args).await;

    match res {
        Ok(addrs) => {
            for addr in addrs {
                println!("{}", addr);
            }
            true
        }
        Err(e) => {
            error!("Unable to retrieve addrs. Received error: {}", e);
            false
        }
    }
}

fn get_help(args: Vec<String>) {
    help(args.get(0).map(String::as_str));
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let mut args: Vec<_> = std::env::args().skip(1).collect();

    if args.is_empty() {
        help(None);
        return;
    }

    let cmd = args.remove(0);

    match &cmd[..] {
        "addrs" => {
            if !get_addrs(args).await {
                std::process::exit(1);
            }
        }
        _ => get_help(args),
    }
}
