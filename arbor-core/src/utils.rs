//! Utility functions for the container
//!
//! Bean naming conventions and creation-cycle tracking shared by the
//! providers, drivers and the container.

/// Naming convention utilities for bean names
pub mod naming {
    /// Converts a PascalCase type name to camelCase for bean naming.
    ///
    /// This is the default bean naming strategy: `UserService` becomes `userService`.
    ///
    /// # Examples
    ///
    /// ```
    /// use arbor_core::utils::naming::to_camel_case;
    ///
    /// assert_eq!(to_camel_case("UserService"), "userService");
    /// assert_eq!(to_camel_case("A"), "a");
    /// assert_eq!(to_camel_case(""), "");
    /// ```
    pub fn to_camel_case(s: &str) -> String {
        let mut chars = s.chars();
        match chars.next() {
            None => String::new(),
            Some(first) => {
                let mut result = String::with_capacity(s.len());
                result.extend(first.to_lowercase());
                result.push_str(chars.as_str());
                result
            }
        }
    }

    /// Upper-cases the first character: `userCreated` becomes `UserCreated`.
    pub fn to_pascal_case(s: &str) -> String {
        let mut chars = s.chars();
        match chars.next() {
            None => String::new(),
            Some(first) => {
                let mut result = String::with_capacity(s.len());
                result.extend(first.to_uppercase());
                result.push_str(chars.as_str());
                result
            }
        }
    }

    /// Converts a string to snake_case.
    ///
    /// # Examples
    ///
    /// ```
    /// use arbor_core::utils::naming::to_snake_case;
    ///
    /// assert_eq!(to_snake_case("UserService"), "user_service");
    /// assert_eq!(to_snake_case("userCreated"), "user_created");
    /// ```
    pub fn to_snake_case(s: &str) -> String {
        let mut result = String::with_capacity(s.len() + s.len() / 2);

        for ch in s.chars() {
            if ch.is_uppercase() {
                if !result.is_empty() && !result.ends_with('_') {
                    result.push('_');
                }
                result.extend(ch.to_lowercase());
            } else {
                result.push(ch);
            }
        }

        result
    }

    /// Maps a setter method name to the property it writes.
    ///
    /// Both `set_foo` and `setFoo` map to `foo`; anything else is not a setter.
    ///
    /// ```
    /// use arbor_core::utils::naming::setter_to_property;
    ///
    /// assert_eq!(setter_to_property("set_repository").as_deref(), Some("repository"));
    /// assert_eq!(setter_to_property("setRepository").as_deref(), Some("repository"));
    /// assert_eq!(setter_to_property("settle"), None);
    /// ```
    pub fn setter_to_property(method: &str) -> Option<String> {
        if let Some(rest) = method.strip_prefix("set_") {
            return (!rest.is_empty()).then(|| rest.to_string());
        }
        let rest = method.strip_prefix("set")?;
        match rest.chars().next() {
            Some(first) if first.is_uppercase() => Some(to_camel_case(rest)),
            _ => None,
        }
    }

    /// Event handler method names, in lookup order: `on_user_created`, then `onUserCreated`.
    pub fn event_handler_names(event: &str) -> [String; 2] {
        [
            format!("on_{}", to_snake_case(event)),
            format!("on{}", to_pascal_case(event)),
        ]
    }
}

/// Dependency resolution utilities
pub mod dependency {
    use parking_lot::Mutex;

    /// Tracks beans currently being resolved or created to detect circular dependencies.
    ///
    /// Names are kept as a stack in entry order so a detected cycle can be
    /// reported as the full chain, e.g. `a -> b -> a`.
    #[derive(Debug, Default)]
    pub struct CreationTracker {
        creating: Mutex<Vec<String>>,
    }

    impl CreationTracker {
        /// Creates a new empty creation tracker.
        pub fn new() -> Self {
            Self::default()
        }

        /// Checks if a bean is currently being created.
        pub fn is_creating(&self, name: &str) -> bool {
            self.creating.lock().iter().any(|n| n == name)
        }

        /// Marks a bean as being created.
        ///
        /// Returns the dependency chain closing the cycle if the bean is already
        /// being created.
        pub fn start_creating(&self, name: &str) -> Result<(), Vec<String>> {
            let mut creating = self.creating.lock();
            if let Some(position) = creating.iter().position(|n| n == name) {
                let mut cycle = creating[position..].to_vec();
                cycle.push(name.to_string());
                return Err(cycle);
            }
            creating.push(name.to_string());
            Ok(())
        }

        /// Marks a bean as finished being created.
        pub fn finish_creating(&self, name: &str) {
            let mut creating = self.creating.lock();
            if let Some(position) = creating.iter().rposition(|n| n == name) {
                creating.remove(position);
            }
        }

        /// Starts tracking `name` and returns a guard that finishes it on drop.
        pub fn enter(&self, name: &str) -> Result<CreationGuard<'_>, Vec<String>> {
            self.start_creating(name)?;
            Ok(CreationGuard {
                tracker: self,
                name: name.to_string(),
            })
        }

        /// Gets a snapshot of all beans currently being created, outermost first.
        pub fn current_creating(&self) -> Vec<String> {
            self.creating.lock().clone()
        }
    }

    /// Finishes tracking a bean when dropped, including on early error returns.
    #[derive(Debug)]
    pub struct CreationGuard<'a> {
        tracker: &'a CreationTracker,
        name: String,
    }

    impl Drop for CreationGuard<'_> {
        fn drop(&mut self) {
            self.tracker.finish_creating(&self.name);
        }
    }
}
