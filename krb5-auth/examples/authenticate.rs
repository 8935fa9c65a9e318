use krb5_auth::{authenticate, setup};
use std::env;

fn main() {
    setup(|config| {
        config.service = env::var("KRB5_AUTH_SERVICE").ok();
        config.server = env::var("KRB5_AUTH_SERVER").ok();
        config.keytab_path = env::var_os("KRB5_AUTH_KEYTAB").map(Into::into);
    });

    let mut args = env::args().skip(1);
    let username = args.next().expect("usage: authenticate <principal> <password>");
    let password = args.next().expect("usage: authenticate <principal> <password>");

    match authenticate(&username, &password) {
        Ok(()) => println!("authenticated {}", username),
        Err(e) => println!("authentication failed: {}", e),
    }
}
