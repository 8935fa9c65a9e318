use krb5_auth::{authenticate, setup, Error};
use std::env;

fn run() -> Result<(), Error> {
    setup(|config| {
        config.service = env::var("TESTKRB5_SERVICE").ok();
        config.server = env::var("TESTKRB5_SERVER").ok();
        config.keytab_path = env::var_os("TESTKRB5_KEYTAB").map(Into::into);
        if let Ok(encoded) = env::var("TESTKRB5_KEYTAB_BASE64") {
            config.set_keytab_base64(&encoded).expect("bad TESTKRB5_KEYTAB_BASE64");
        }
        config.use_secure_context = env::var_os("TESTKRB5_INSECURE_CONTEXT").is_none();
    });

    let username = env::var("TESTKRB5_USER").expect("TESTKRB5_USER not set");
    let password = env::var("TESTKRB5_PASS").expect("TESTKRB5_PASS not set");
    authenticate(&username, &password)?;
    println!("authenticated {}", username);
    Ok(())
}

fn main() {
    env_logger::init();
    match run() {
        Ok(()) => (),
        Err(e) => {
            println!("{}", e);
            std::process::exit(1)
        }
    }
}
