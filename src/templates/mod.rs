// templates/mod.rs — planning the generated file set.
//
// `plan_files` turns a `GenerationConfig` into the concrete list of files
// to write, all paths relative to the project's source root. The TypeScript
// text itself lives in `catalog`; inclusion predicates live here, so the
// catalog stays a flat library of template functions.

mod catalog;

use std::path::PathBuf;

use crate::config::{AuthStrategy, GenerationConfig, Orm};

/// One planned file: relative path plus rendered content.
#[derive(Debug, Clone)]
pub struct FileSpec {
    /// Path relative to the project's source root.
    pub path: PathBuf,
    pub content: String,
}

impl FileSpec {
    fn new(path: &str, content: String) -> Self {
        Self {
            path: PathBuf::from(path),
            content,
        }
    }
}

/// Edits to apply to `app.module.ts`: import statements to ensure plus
/// entries to merge into the `@Module` imports array.
#[derive(Debug, Clone)]
pub struct ModuleWiring {
    /// (module path, names) pairs for the import section.
    pub imports: Vec<(String, Vec<String>)>,
    /// Source text of the entries for the `imports: [...]` array.
    pub entries: Vec<String>,
}

/// Edits to apply to `main.ts`: imports, an idempotency marker, and the
/// statement block to place before the listen call.
#[derive(Debug, Clone)]
pub struct BootstrapWiring {
    pub imports: Vec<(String, Vec<String>)>,
    /// (module path, alias) pairs rendered as `import * as alias from 'm';`.
    pub namespace_imports: Vec<(String, String)>,
    pub marker: String,
    pub block: String,
}

pub fn plan_files(config: &GenerationConfig) -> Vec<FileSpec> {
    let mut files = vec![
        FileSpec::new("auth/auth.module.ts", catalog::auth_module(config)),
        FileSpec::new("auth/auth.controller.ts", catalog::auth_controller(config)),
        FileSpec::new("auth/auth.service.ts", catalog::auth_service(config)),
        FileSpec::new("auth/dto/login.dto.ts", catalog::login_dto(config)),
        FileSpec::new("auth/dto/register.dto.ts", catalog::register_dto(config)),
        FileSpec::new(
            "auth/guards/local-auth.guard.ts",
            catalog::local_auth_guard(),
        ),
        FileSpec::new(
            "auth/decorators/public.decorator.ts",
            catalog::public_decorator(),
        ),
        FileSpec::new(
            "auth/strategies/local.strategy.ts",
            catalog::local_strategy(config),
        ),
        FileSpec::new("users/users.module.ts", catalog::users_module(config)),
        FileSpec::new("users/users.service.ts", catalog::users_service(config)),
    ];

    match config.strategy {
        AuthStrategy::Jwt => {
            files.push(FileSpec::new("auth/constants.ts", catalog::constants(config)));
            files.push(FileSpec::new(
                "auth/strategies/jwt.strategy.ts",
                catalog::jwt_strategy(config),
            ));
            files.push(FileSpec::new(
                "auth/guards/jwt-auth.guard.ts",
                catalog::jwt_auth_guard(),
            ));
            if config.refresh_rotation {
                files.push(FileSpec::new(
                    "auth/strategies/refresh.strategy.ts",
                    catalog::refresh_strategy(config),
                ));
                files.push(FileSpec::new(
                    "auth/guards/refresh-auth.guard.ts",
                    catalog::refresh_auth_guard(),
                ));
            }
        }
        AuthStrategy::Session => {
            files.push(FileSpec::new(
                "auth/session.serializer.ts",
                catalog::session_serializer(),
            ));
            files.push(FileSpec::new(
                "auth/guards/authenticated.guard.ts",
                catalog::authenticated_guard(),
            ));
        }
    }

    if config.authorization {
        files.push(FileSpec::new(
            "auth/guards/roles.guard.ts",
            catalog::roles_guard(),
        ));
        files.push(FileSpec::new(
            "auth/decorators/roles.decorator.ts",
            catalog::roles_decorator(config),
        ));
    }

    if config.password_reset {
        files.push(FileSpec::new(
            "auth/dto/forgot-password.dto.ts",
            catalog::forgot_password_dto(),
        ));
        files.push(FileSpec::new(
            "auth/dto/reset-password.dto.ts",
            catalog::reset_password_dto(),
        ));
    }

    match config.orm {
        Orm::TypeOrm => files.push(FileSpec::new(
            "users/user.entity.ts",
            catalog::user_entity_typeorm(config),
        )),
        Orm::Mongoose => files.push(FileSpec::new(
            "users/user.schema.ts",
            catalog::user_schema_mongoose(config),
        )),
        Orm::Prisma => files.push(FileSpec::new(
            "users/user.model.prisma",
            catalog::user_model_prisma(config),
        )),
    }

    if config.with_tests {
        files.push(FileSpec::new(
            "auth/auth.service.spec.ts",
            catalog::auth_service_spec(config),
        ));
        files.push(FileSpec::new(
            "auth/auth.controller.spec.ts",
            catalog::auth_controller_spec(),
        ));
    }

    files
}

/// What `app.module.ts` must end up importing and wiring.
pub fn module_wiring(config: &GenerationConfig) -> ModuleWiring {
    let mut imports = vec![
        (
            "@nestjs/config".to_string(),
            vec!["ConfigModule".to_string()],
        ),
        (
            "./auth/auth.module".to_string(),
            vec!["AuthModule".to_string()],
        ),
        (
            "./users/users.module".to_string(),
            vec!["UsersModule".to_string()],
        ),
    ];
    let mut entries = vec![
        "ConfigModule.forRoot({ isGlobal: true })".to_string(),
        "AuthModule".to_string(),
        "UsersModule".to_string(),
    ];
    if config.rate_limiting {
        imports.push((
            "@nestjs/throttler".to_string(),
            vec!["ThrottlerModule".to_string()],
        ));
        entries.push("ThrottlerModule.forRoot([{ ttl: 60000, limit: 10 }])".to_string());
    }
    ModuleWiring { imports, entries }
}

/// What `main.ts` must end up doing before it listens.
pub fn bootstrap_wiring(config: &GenerationConfig) -> BootstrapWiring {
    let mut imports = vec![(
        "@nestjs/common".to_string(),
        vec!["ValidationPipe".to_string()],
    )];
    let mut namespace_imports = Vec::new();
    let mut block = String::from(
        "app.useGlobalPipes(new ValidationPipe({ whitelist: true, transform: true }));\n",
    );

    if config.strategy == AuthStrategy::Session {
        namespace_imports.push(("express-session".to_string(), "session".to_string()));
        namespace_imports.push(("passport".to_string(), "passport".to_string()));
        block.push_str(
            r#"app.use(
  session({
    secret: process.env.SESSION_SECRET ?? 'change-me',
    resave: false,
    saveUninitialized: false,
    cookie: { httpOnly: true, sameSite: 'lax' },
  }),
);
app.use(passport.initialize());
app.use(passport.session());
"#,
        );
    }

    if config.api_docs {
        imports.push((
            "@nestjs/swagger".to_string(),
            vec!["DocumentBuilder".to_string(), "SwaggerModule".to_string()],
        ));
        block.push_str(&format!(
            r#"const swaggerConfig = new DocumentBuilder()
  .setTitle('{name}')
  .setVersion('1.0')
  .addBearerAuth()
  .build();
SwaggerModule.setup('docs', app, SwaggerModule.createDocument(app, swaggerConfig));
"#,
            name = config.project_name
        ));
    }

    BootstrapWiring {
        imports,
        namespace_imports,
        // ValidationPipe appears in every variant of the block, so it
        // doubles as the already-applied marker.
        marker: "ValidationPipe".to_string(),
        block,
    }
}
