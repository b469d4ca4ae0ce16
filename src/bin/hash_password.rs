use std::io::{self, BufRead};

use storefront_admin::utils::hash_password;

/// 从标准输入读取管理员密码，输出 ADMIN_PASSWORD_HASH
fn main() {
    let mut line = String::new();
    if let Err(e) = io::stdin().lock().read_line(&mut line) {
        eprintln!("Failed to read password: {}", e);
        std::process::exit(1);
    }

    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        eprintln!("Password must not be empty");
        std::process::exit(1);
    }

    match hash_password(password) {
        Ok(hash) => println!("ADMIN_PASSWORD_HASH={}", hash),
        Err(e) => {
            eprintln!("Failed to hash password: {}", e);
            std::process::exit(1);
        }
    }
}
