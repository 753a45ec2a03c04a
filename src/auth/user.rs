//! Profile of the signed-in console user.

// self
use crate::_prelude::*;

/// Role name that grants administrator rights.
pub const ADMIN_ROLE: &str = "ADMIN";

/// User profile returned alongside issued tokens and by the user-info endpoint.
///
/// Every field tolerates absence because the server omits empty attributes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserInfo {
	/// Numeric user identifier.
	pub id: Option<i64>,
	/// Login name.
	pub username: String,
	/// Display name, when configured.
	pub real_name: String,
	/// Contact email.
	pub email: String,
	/// Contact phone number.
	pub phone: String,
	/// Avatar URL.
	pub avatar: String,
	/// Explicit administrator flag.
	pub is_admin: bool,
	/// Granted role names.
	pub roles: Vec<String>,
	/// Granted permission names.
	pub permissions: Vec<String>,
	/// Timestamp of the previous login as reported by the server.
	pub last_login_time: Option<String>,
	/// Address of the previous login.
	pub last_login_ip: Option<String>,
}
impl UserInfo {
	/// Returns `true` if the user carries the admin flag or the [`ADMIN_ROLE`] role.
	pub fn is_admin_user(&self) -> bool {
		self.is_admin || self.roles.iter().any(|role| role == ADMIN_ROLE)
	}

	/// Prefers the real name and falls back to the login name.
	pub fn display_name(&self) -> &str {
		if self.real_name.is_empty() { &self.username } else { &self.real_name }
	}

	/// Returns `true` if the user holds any of `wanted`; an empty query never matches.
	pub fn has_permission<S>(&self, wanted: &[S]) -> bool
	where
		S: AsRef<str>,
	{
		holds_any(&self.permissions, wanted)
	}

	/// Returns `true` if the user holds any of `wanted`; an empty query never matches.
	pub fn has_role<S>(&self, wanted: &[S]) -> bool
	where
		S: AsRef<str>,
	{
		holds_any(&self.roles, wanted)
	}
}

fn holds_any<S>(granted: &[String], wanted: &[S]) -> bool
where
	S: AsRef<str>,
{
	wanted.iter().any(|w| granted.iter().any(|g| g == w.as_ref()))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn role_and_permission_checks_match_any() {
		let user = UserInfo {
			username: "ops".into(),
			roles: vec!["OPERATOR".into()],
			permissions: vec!["device:read".into(), "task:write".into()],
			..Default::default()
		};

		assert!(user.has_permission(&["device:write", "task:write"]));
		assert!(!user.has_permission::<&str>(&[]));
		assert!(user.has_role(&["OPERATOR"]));
		assert!(!user.is_admin_user());
		assert_eq!(user.display_name(), "ops");
	}

	#[test]
	fn admin_role_implies_admin_user() {
		let user: UserInfo =
			serde_json::from_str(r#"{"username":"root","realName":"管理员","roles":["ADMIN"]}"#)
				.expect("User fixture should decode.");

		assert!(user.is_admin_user());
		assert_eq!(user.display_name(), "管理员");
	}
}
