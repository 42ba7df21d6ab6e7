//! `declare_api!`: typed method wrappers over a declared API.

/// Declare an API type with one method per endpoint.
///
/// ```rust,ignore
/// use restbind_core::{declare_api, ApiClient, CallArgs, ClientConfig};
///
/// declare_api! {
///     /// The JSON placeholder API.
///     pub struct Placeholder: ApiClient {
///         posts = get("posts/");
///         comments = get("posts/{id}/comments");
///         add_post = post("posts/");
///     }
/// }
///
/// let schema = Placeholder::declaration()
///     .finalize_for("add_post", my_finalize)
///     .build()?;
/// let api = Placeholder::from_client(ApiClient::new(schema, ClientConfig::new(url))?)?;
/// let comments = api.comments(CallArgs::new().arg("id", 2))?;
/// ```
///
/// The client type decides the base (`ApiClient` or `AsyncApiClient`) and
/// what each method returns. Verbs are checked when the declaration is built.
#[macro_export]
macro_rules! declare_api {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident : $client:ty {
            $(
                $(#[$method_meta:meta])*
                $method:ident = $verb:ident ( $template:literal );
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $name {
            client: $client,
        }

        impl $name {
            /// The endpoints of this API, ready for extra hooks.
            pub fn declaration() -> $crate::ApiBuilder {
                $crate::ApiBuilder::new(stringify!($name))
                    .extends(<$client as $crate::ClientBase>::BASE)
                    $( .route(stringify!($method), stringify!($verb), $template) )*
            }

            /// `declaration()` built without extra hooks.
            pub fn schema() -> ::std::result::Result<::std::sync::Arc<$crate::ApiSchema>, $crate::ApiError> {
                Self::declaration().build()
            }

            /// Wrap a client whose schema binds every method of this API.
            pub fn from_client(client: $client) -> ::std::result::Result<Self, $crate::ApiError> {
                let schema = <$client as $crate::ClientBase>::schema(&client);
                $( schema.binding(stringify!($method))?; )*
                Ok(Self { client })
            }

            pub fn client(&self) -> &$client {
                &self.client
            }

            $(
                $(#[$method_meta])*
                pub fn $method(&self, args: $crate::CallArgs) -> <$client as $crate::ClientBase>::Output {
                    $crate::ClientBase::dispatch(&self.client, stringify!($method), args)
                }
            )*
        }
    };
}
