// templates/catalog.rs — the TypeScript templates, one function per file.
//
// Templates are intentionally minimal working boilerplate: enough to run
// and log in against immediately, leaving room for the project's own
// features. Conditional sections are ordinary Rust branches over the
// config; the output carries no templating syntax.

use crate::config::{AuthStrategy, GenerationConfig, Orm};

// ─── auth module ────────────────────────────────────────────────────────────

pub fn auth_module(config: &GenerationConfig) -> String {
    let mut imports = String::from(
        r#"import { Module } from '@nestjs/common';
import { PassportModule } from '@nestjs/passport';
import { AuthController } from './auth.controller';
import { AuthService } from './auth.service';
import { LocalStrategy } from './strategies/local.strategy';
import { UsersModule } from '../users/users.module';
"#,
    );
    let mut module_imports = Vec::new();
    let mut providers = vec!["AuthService", "LocalStrategy"];
    module_imports.push("UsersModule".to_string());

    match config.strategy {
        AuthStrategy::Jwt => {
            imports.push_str(
                r#"import { ConfigModule, ConfigService } from '@nestjs/config';
import { JwtModule } from '@nestjs/jwt';
import { JwtStrategy } from './strategies/jwt.strategy';
"#,
            );
            module_imports.push("PassportModule".to_string());
            module_imports.push(format!(
                r#"JwtModule.registerAsync({{
      imports: [ConfigModule],
      inject: [ConfigService],
      useFactory: (config: ConfigService) => ({{
        secret: config.get<string>('JWT_SECRET'),
        signOptions: {{ expiresIn: '{ttl}' }},
      }}),
    }})"#,
                ttl = config.access_token_ttl
            ));
            providers.push("JwtStrategy");
            if config.refresh_rotation {
                imports.push_str(
                    "import { RefreshStrategy } from './strategies/refresh.strategy';\n",
                );
                providers.push("RefreshStrategy");
            }
        }
        AuthStrategy::Session => {
            imports.push_str(
                "import { SessionSerializer } from './session.serializer';\n",
            );
            module_imports.push("PassportModule.register({ session: true })".to_string());
            providers.push("SessionSerializer");
        }
    }
    if config.authorization {
        imports.push_str("import { RolesGuard } from './guards/roles.guard';\n");
        providers.push("RolesGuard");
    }

    let imports_block = module_imports
        .iter()
        .map(|e| format!("    {e},"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"{imports}
@Module({{
  imports: [
{imports_block}
  ],
  controllers: [AuthController],
  providers: [{providers}],
  exports: [AuthService],
}})
export class AuthModule {{}}
"#,
        providers = providers.join(", ")
    )
}

// ─── controller ─────────────────────────────────────────────────────────────

pub fn auth_controller(config: &GenerationConfig) -> String {
    let mut out = String::from(
        r#"import { Body, Controller, Get, Post, Request, UseGuards } from '@nestjs/common';
import { AuthService } from './auth.service';
import { LocalAuthGuard } from './guards/local-auth.guard';
import { Public } from './decorators/public.decorator';
import { RegisterDto } from './dto/register.dto';
"#,
    );
    match config.strategy {
        AuthStrategy::Jwt => {
            out.push_str("import { JwtAuthGuard } from './guards/jwt-auth.guard';\n");
            if config.refresh_rotation {
                out.push_str(
                    "import { RefreshAuthGuard } from './guards/refresh-auth.guard';\n",
                );
            }
        }
        AuthStrategy::Session => {
            out.push_str(
                "import { AuthenticatedGuard } from './guards/authenticated.guard';\n",
            );
        }
    }
    if config.password_reset {
        out.push_str(
            r#"import { ForgotPasswordDto } from './dto/forgot-password.dto';
import { ResetPasswordDto } from './dto/reset-password.dto';
"#,
        );
    }

    out.push_str(
        r#"
@Controller('auth')
export class AuthController {
  constructor(private readonly authService: AuthService) {}

  @Public()
  @Post('register')
  register(@Body() dto: RegisterDto) {
    return this.authService.register(dto);
  }

  @Public()
  @UseGuards(LocalAuthGuard)
  @Post('login')
  login(@Request() req) {
    return this.authService.login(req.user);
  }
"#,
    );
    match config.strategy {
        AuthStrategy::Jwt => {
            if config.refresh_rotation {
                out.push_str(
                    r#"
  @Public()
  @UseGuards(RefreshAuthGuard)
  @Post('refresh')
  refresh(@Request() req) {
    return this.authService.refresh(req.user);
  }
"#,
                );
            }
            out.push_str(
                r#"
  @UseGuards(JwtAuthGuard)
  @Get('profile')
  profile(@Request() req) {
    return req.user;
  }
"#,
            );
        }
        AuthStrategy::Session => {
            out.push_str(
                r#"
  @UseGuards(AuthenticatedGuard)
  @Get('profile')
  profile(@Request() req) {
    return req.user;
  }

  @UseGuards(AuthenticatedGuard)
  @Post('logout')
  logout(@Request() req) {
    req.logout(() => undefined);
    return { ok: true };
  }
"#,
            );
        }
    }
    if config.password_reset {
        out.push_str(
            r#"
  @Public()
  @Post('forgot-password')
  forgotPassword(@Body() dto: ForgotPasswordDto) {
    return this.authService.forgotPassword(dto.email);
  }

  @Public()
  @Post('reset-password')
  resetPassword(@Body() dto: ResetPasswordDto) {
    return this.authService.resetPassword(dto.token, dto.password);
  }
"#,
        );
    }
    out.push_str("}\n");
    out
}

// ─── service ────────────────────────────────────────────────────────────────

pub fn auth_service(config: &GenerationConfig) -> String {
    let identity = if config.username_field {
        "usernameOrEmail"
    } else {
        "email"
    };
    let lookup = if config.username_field {
        "findByUsernameOrEmail"
    } else {
        "findByEmail"
    };
    let mut out = String::from(
        r#"import { Injectable, UnauthorizedException } from '@nestjs/common';
import * as bcrypt from 'bcrypt';
import { UsersService } from '../users/users.service';
import { RegisterDto } from './dto/register.dto';
"#,
    );
    if config.strategy == AuthStrategy::Jwt {
        out.push_str("import { JwtService } from '@nestjs/jwt';\n");
    }

    out.push_str("\n@Injectable()\nexport class AuthService {\n");
    match config.strategy {
        AuthStrategy::Jwt => out.push_str(
            r#"  constructor(
    private readonly usersService: UsersService,
    private readonly jwtService: JwtService,
  ) {}
"#,
        ),
        AuthStrategy::Session => out.push_str(
            "  constructor(private readonly usersService: UsersService) {}\n",
        ),
    }

    out.push_str(&format!(
        r#"
  async validateUser({identity}: string, password: string) {{
    const user = await this.usersService.{lookup}({identity});
    if (!user) {{
      throw new UnauthorizedException('Invalid credentials');
    }}
    const matches = await bcrypt.compare(password, user.passwordHash);
    if (!matches) {{
      throw new UnauthorizedException('Invalid credentials');
    }}
    const {{ passwordHash, ...safe }} = user;
    return safe;
  }}

  async register(dto: RegisterDto) {{
    const passwordHash = await bcrypt.hash(dto.password, 10);
    return this.usersService.create({{ ...dto, password: undefined, passwordHash }});
  }}
"#
    ));

    match config.strategy {
        AuthStrategy::Jwt => {
            let role_claim = if config.authorization {
                ", roles: user.roles"
            } else {
                ""
            };
            out.push_str(&format!(
                r#"
  async login(user: any) {{
    const payload = {{ sub: user.id, {identity}: user.{identity}{role_claim} }};
"#
            ));
            if config.refresh_rotation {
                out.push_str(&format!(
                    r#"    return {{
      accessToken: await this.jwtService.signAsync(payload),
      refreshToken: await this.jwtService.signAsync(payload, {{
        secret: process.env.JWT_REFRESH_SECRET,
        expiresIn: '{refresh_ttl}',
      }}),
    }};
  }}

  async refresh(user: any) {{
    // Rotation: each refresh issues a fresh pair; old tokens simply expire.
    return this.login(user);
  }}
"#,
                    refresh_ttl = config.refresh_token_ttl
                ));
            } else {
                out.push_str(
                    r#"    return { accessToken: await this.jwtService.signAsync(payload) };
  }
"#,
                );
            }
        }
        AuthStrategy::Session => {
            out.push_str(
                r#"
  async login(user: any) {
    // Passport attaches the user to the session; nothing to issue.
    return user;
  }
"#,
            );
        }
    }

    if config.email_verification {
        out.push_str(
            r#"
  async markEmailVerified(userId: string) {
    return this.usersService.setEmailVerified(userId);
  }
"#,
        );
    }
    if config.password_reset {
        out.push_str(
            r#"
  async forgotPassword(email: string) {
    // Token delivery (mail) is wired by the host application.
    return this.usersService.issuePasswordResetToken(email);
  }

  async resetPassword(token: string, password: string) {
    const passwordHash = await bcrypt.hash(password, 10);
    return this.usersService.consumePasswordResetToken(token, passwordHash);
  }
"#,
        );
    }
    out.push_str("}\n");
    out
}

// ─── strategies ─────────────────────────────────────────────────────────────

pub fn constants(config: &GenerationConfig) -> String {
    format!(
        r#"export const jwtConstants = {{
  accessTtl: '{access}',
  refreshTtl: '{refresh}',
}};
"#,
        access = config.access_token_ttl,
        refresh = config.refresh_token_ttl
    )
}

pub fn jwt_strategy(config: &GenerationConfig) -> String {
    let roles_field = if config.authorization {
        ", roles: payload.roles ?? []"
    } else {
        ""
    };
    let identity = if config.username_field {
        "usernameOrEmail"
    } else {
        "email"
    };
    format!(
        r#"import {{ Injectable }} from '@nestjs/common';
import {{ ConfigService }} from '@nestjs/config';
import {{ PassportStrategy }} from '@nestjs/passport';
import {{ ExtractJwt, Strategy }} from 'passport-jwt';

@Injectable()
export class JwtStrategy extends PassportStrategy(Strategy) {{
  constructor(config: ConfigService) {{
    super({{
      jwtFromRequest: ExtractJwt.fromAuthHeaderAsBearerToken(),
      ignoreExpiration: false,
      secretOrKey: config.get<string>('JWT_SECRET'),
    }});
  }}

  async validate(payload: any) {{
    return {{ id: payload.sub, {identity}: payload.{identity}{roles_field} }};
  }}
}}
"#
    )
}

pub fn refresh_strategy(config: &GenerationConfig) -> String {
    let identity = if config.username_field {
        "usernameOrEmail"
    } else {
        "email"
    };
    format!(
        r#"import {{ Injectable }} from '@nestjs/common';
import {{ PassportStrategy }} from '@nestjs/passport';
import {{ ExtractJwt, Strategy }} from 'passport-jwt';

@Injectable()
export class RefreshStrategy extends PassportStrategy(Strategy, 'jwt-refresh') {{
  constructor() {{
    super({{
      jwtFromRequest: ExtractJwt.fromBodyField('refreshToken'),
      ignoreExpiration: false,
      secretOrKey: process.env.JWT_REFRESH_SECRET,
    }});
  }}

  async validate(payload: any) {{
    return {{ id: payload.sub, {identity}: payload.{identity} }};
  }}
}}
"#
    )
}

pub fn local_strategy(config: &GenerationConfig) -> String {
    let field = if config.username_field {
        "usernameOrEmail"
    } else {
        "email"
    };
    format!(
        r#"import {{ Injectable }} from '@nestjs/common';
import {{ PassportStrategy }} from '@nestjs/passport';
import {{ Strategy }} from 'passport-local';
import {{ AuthService }} from '../auth.service';

@Injectable()
export class LocalStrategy extends PassportStrategy(Strategy) {{
  constructor(private readonly authService: AuthService) {{
    super({{ usernameField: '{field}' }});
  }}

  async validate({field}: string, password: string) {{
    return this.authService.validateUser({field}, password);
  }}
}}
"#
    )
}

// ─── guards and decorators ──────────────────────────────────────────────────

pub fn jwt_auth_guard() -> String {
    r#"import { ExecutionContext, Injectable } from '@nestjs/common';
import { Reflector } from '@nestjs/core';
import { AuthGuard } from '@nestjs/passport';
import { IS_PUBLIC_KEY } from '../decorators/public.decorator';

@Injectable()
export class JwtAuthGuard extends AuthGuard('jwt') {
  constructor(private readonly reflector: Reflector) {
    super();
  }

  canActivate(context: ExecutionContext) {
    const isPublic = this.reflector.getAllAndOverride<boolean>(IS_PUBLIC_KEY, [
      context.getHandler(),
      context.getClass(),
    ]);
    if (isPublic) {
      return true;
    }
    return super.canActivate(context);
  }
}
"#
    .to_string()
}

pub fn local_auth_guard() -> String {
    r#"import { Injectable } from '@nestjs/common';
import { AuthGuard } from '@nestjs/passport';

@Injectable()
export class LocalAuthGuard extends AuthGuard('local') {}
"#
    .to_string()
}

pub fn refresh_auth_guard() -> String {
    r#"import { Injectable } from '@nestjs/common';
import { AuthGuard } from '@nestjs/passport';

@Injectable()
export class RefreshAuthGuard extends AuthGuard('jwt-refresh') {}
"#
    .to_string()
}

pub fn authenticated_guard() -> String {
    r#"import { CanActivate, ExecutionContext, Injectable } from '@nestjs/common';

@Injectable()
export class AuthenticatedGuard implements CanActivate {
  canActivate(context: ExecutionContext) {
    return context.switchToHttp().getRequest().isAuthenticated();
  }
}
"#
    .to_string()
}

pub fn roles_guard() -> String {
    r#"import { CanActivate, ExecutionContext, Injectable } from '@nestjs/common';
import { Reflector } from '@nestjs/core';
import { ROLES_KEY } from '../decorators/roles.decorator';

@Injectable()
export class RolesGuard implements CanActivate {
  constructor(private readonly reflector: Reflector) {}

  canActivate(context: ExecutionContext) {
    const required = this.reflector.getAllAndOverride<string[]>(ROLES_KEY, [
      context.getHandler(),
      context.getClass(),
    ]);
    if (!required || required.length === 0) {
      return true;
    }
    const { user } = context.switchToHttp().getRequest();
    return required.some((role) => user?.roles?.includes(role));
  }
}
"#
    .to_string()
}

pub fn public_decorator() -> String {
    r#"import { SetMetadata } from '@nestjs/common';

export const IS_PUBLIC_KEY = 'isPublic';
export const Public = () => SetMetadata(IS_PUBLIC_KEY, true);
"#
    .to_string()
}

pub fn roles_decorator(config: &GenerationConfig) -> String {
    let variants = config
        .roles
        .iter()
        .map(|r| format!("  {} = '{}',", pascal(r), r))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"import {{ SetMetadata }} from '@nestjs/common';

export enum Role {{
{variants}
}}

export const ROLES_KEY = 'roles';
export const Roles = (...roles: Role[]) => SetMetadata(ROLES_KEY, roles);
"#
    )
}

fn pascal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper = true;
    for c in s.chars() {
        if c == '-' || c == '_' || c == ' ' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

// ─── DTOs ───────────────────────────────────────────────────────────────────

pub fn login_dto(config: &GenerationConfig) -> String {
    let identity = if config.username_field {
        "  @IsString()\n  usernameOrEmail: string;\n"
    } else {
        "  @IsEmail()\n  email: string;\n"
    };
    format!(
        r#"import {{ IsEmail, IsString, MinLength }} from 'class-validator';

export class LoginDto {{
{identity}
  @IsString()
  @MinLength(8)
  password: string;
}}
"#
    )
}

pub fn register_dto(config: &GenerationConfig) -> String {
    let username = if config.username_field {
        "\n  @IsString()\n  username: string;\n"
    } else {
        ""
    };
    format!(
        r#"import {{ IsEmail, IsString, MinLength }} from 'class-validator';

export class RegisterDto {{
  @IsEmail()
  email: string;
{username}
  @IsString()
  @MinLength(8)
  password: string;
}}
"#
    )
}

pub fn forgot_password_dto() -> String {
    r#"import { IsEmail } from 'class-validator';

export class ForgotPasswordDto {
  @IsEmail()
  email: string;
}
"#
    .to_string()
}

pub fn reset_password_dto() -> String {
    r#"import { IsString, MinLength } from 'class-validator';

export class ResetPasswordDto {
  @IsString()
  token: string;

  @IsString()
  @MinLength(8)
  password: string;
}
"#
    .to_string()
}

// ─── users ──────────────────────────────────────────────────────────────────

pub fn users_module(config: &GenerationConfig) -> String {
    match config.orm {
        Orm::TypeOrm => r#"import { Module } from '@nestjs/common';
import { TypeOrmModule } from '@nestjs/typeorm';
import { User } from './user.entity';
import { UsersService } from './users.service';

@Module({
  imports: [TypeOrmModule.forFeature([User])],
  providers: [UsersService],
  exports: [UsersService],
})
export class UsersModule {}
"#
        .to_string(),
        Orm::Mongoose => r#"import { Module } from '@nestjs/common';
import { MongooseModule } from '@nestjs/mongoose';
import { User, UserSchema } from './user.schema';
import { UsersService } from './users.service';

@Module({
  imports: [MongooseModule.forFeature([{ name: User.name, schema: UserSchema }])],
  providers: [UsersService],
  exports: [UsersService],
})
export class UsersModule {}
"#
        .to_string(),
        Orm::Prisma => r#"import { Module } from '@nestjs/common';
import { UsersService } from './users.service';

@Module({
  providers: [UsersService],
  exports: [UsersService],
})
export class UsersModule {}
"#
        .to_string(),
    }
}

pub fn users_service(config: &GenerationConfig) -> String {
    let identity_lookup = if config.username_field {
        r#"
  async findByUsernameOrEmail(usernameOrEmail: string) {
    return (
      (await this.findByEmail(usernameOrEmail)) ??
      (await this.findByUsername(usernameOrEmail))
    );
  }
"#
    } else {
        ""
    };
    match config.orm {
        Orm::TypeOrm => {
            let mut out = String::from(
                r#"import { Injectable } from '@nestjs/common';
import { InjectRepository } from '@nestjs/typeorm';
import { Repository } from 'typeorm';
import { User } from './user.entity';

@Injectable()
export class UsersService {
  constructor(
    @InjectRepository(User)
    private readonly users: Repository<User>,
  ) {}

  async findByEmail(email: string) {
    return this.users.findOne({ where: { email } });
  }
"#,
            );
            if config.username_field {
                out.push_str(
                    r#"
  async findByUsername(username: string) {
    return this.users.findOne({ where: { username } });
  }
"#,
                );
                out.push_str(identity_lookup);
            }
            out.push_str(
                r#"
  async create(data: Partial<User>) {
    const user = this.users.create(data);
    return this.users.save(user);
  }
"#,
            );
            if config.email_verification {
                out.push_str(
                    r#"
  async setEmailVerified(id: string) {
    await this.users.update(id, { emailVerified: true });
    return this.users.findOne({ where: { id } });
  }
"#,
                );
            }
            if config.password_reset {
                out.push_str(
                    r#"
  async issuePasswordResetToken(email: string) {
    // Token persistence is left to the host application's storage choice.
    return { ok: true };
  }

  async consumePasswordResetToken(token: string, passwordHash: string) {
    return { ok: true };
  }
"#,
                );
            }
            out.push_str("}\n");
            out
        }
        Orm::Mongoose => {
            let mut out = String::from(
                r#"import { Injectable } from '@nestjs/common';
import { InjectModel } from '@nestjs/mongoose';
import { Model } from 'mongoose';
import { User, UserDocument } from './user.schema';

@Injectable()
export class UsersService {
  constructor(
    @InjectModel(User.name)
    private readonly users: Model<UserDocument>,
  ) {}

  async findByEmail(email: string) {
    return this.users.findOne({ email }).lean();
  }
"#,
            );
            if config.username_field {
                out.push_str(
                    r#"
  async findByUsername(username: string) {
    return this.users.findOne({ username }).lean();
  }
"#,
                );
                out.push_str(identity_lookup);
            }
            out.push_str(
                r#"
  async create(data: Partial<User>) {
    return this.users.create(data);
  }
}
"#,
            );
            out
        }
        Orm::Prisma => {
            let mut out = String::from(
                r#"import { Injectable } from '@nestjs/common';
import { PrismaService } from '../prisma.service';

@Injectable()
export class UsersService {
  constructor(private readonly prisma: PrismaService) {}

  async findByEmail(email: string) {
    return this.prisma.user.findUnique({ where: { email } });
  }
"#,
            );
            if config.username_field {
                out.push_str(
                    r#"
  async findByUsername(username: string) {
    return this.prisma.user.findUnique({ where: { username } });
  }
"#,
                );
                out.push_str(identity_lookup);
            }
            out.push_str(
                r#"
  async create(data: any) {
    return this.prisma.user.create({ data });
  }
}
"#,
            );
            out
        }
    }
}

pub fn user_entity_typeorm(config: &GenerationConfig) -> String {
    let mut columns = String::from(
        r#"  @Column({ unique: true })
  email: string;

  @Column()
  passwordHash: string;
"#,
    );
    if config.username_field {
        columns.push_str(
            r#"
  @Column({ unique: true, nullable: true })
  username: string;
"#,
        );
    }
    if config.authorization {
        let default_role = config.roles.first().map(String::as_str).unwrap_or("user");
        columns.push_str(&format!(
            r#"
  @Column('simple-array', {{ default: '{default_role}' }})
  roles: string[];
"#
        ));
    }
    if config.email_verification {
        columns.push_str(
            r#"
  @Column({ default: false })
  emailVerified: boolean;
"#,
        );
    }
    format!(
        r#"import {{ Column, CreateDateColumn, Entity, PrimaryGeneratedColumn }} from 'typeorm';

@Entity('users')
export class User {{
  @PrimaryGeneratedColumn('uuid')
  id: string;

{columns}
  @CreateDateColumn()
  createdAt: Date;
}}
"#
    )
}

pub fn user_schema_mongoose(config: &GenerationConfig) -> String {
    let mut props = String::from(
        r#"  @Prop({ required: true, unique: true })
  email: string;

  @Prop({ required: true })
  passwordHash: string;
"#,
    );
    if config.username_field {
        props.push_str(
            r#"
  @Prop({ unique: true, sparse: true })
  username: string;
"#,
        );
    }
    if config.authorization {
        let default_role = config.roles.first().map(String::as_str).unwrap_or("user");
        props.push_str(&format!(
            r#"
  @Prop({{ type: [String], default: ['{default_role}'] }})
  roles: string[];
"#
        ));
    }
    if config.email_verification {
        props.push_str(
            r#"
  @Prop({ default: false })
  emailVerified: boolean;
"#,
        );
    }
    format!(
        r#"import {{ Prop, Schema, SchemaFactory }} from '@nestjs/mongoose';
import {{ HydratedDocument }} from 'mongoose';

export type UserDocument = HydratedDocument<User>;

@Schema({{ timestamps: true }})
export class User {{
{props}}}

export const UserSchema = SchemaFactory.createForClass(User);
"#
    )
}

pub fn user_model_prisma(config: &GenerationConfig) -> String {
    let mut fields = String::from(
        r#"  id           String   @id @default(uuid())
  email        String   @unique
  passwordHash String
"#,
    );
    if config.username_field {
        fields.push_str("  username     String?  @unique\n");
    }
    if config.authorization {
        let default_role = config.roles.first().map(String::as_str).unwrap_or("user");
        fields.push_str(&format!("  roles        String[] @default([\"{default_role}\"])\n"));
    }
    if config.email_verification {
        fields.push_str("  emailVerified Boolean @default(false)\n");
    }
    format!(
        r#"// Merge this model into prisma/schema.prisma, then run `prisma migrate dev`.

model User {{
{fields}  createdAt    DateTime @default(now())
}}
"#
    )
}

pub fn session_serializer() -> String {
    r#"import { Injectable } from '@nestjs/common';
import { PassportSerializer } from '@nestjs/passport';

@Injectable()
export class SessionSerializer extends PassportSerializer {
  serializeUser(user: any, done: (err: Error | null, id?: any) => void) {
    done(null, { id: user.id, email: user.email });
  }

  deserializeUser(payload: any, done: (err: Error | null, user?: any) => void) {
    done(null, payload);
  }
}
"#
    .to_string()
}

// ─── spec files ─────────────────────────────────────────────────────────────

pub fn auth_service_spec(config: &GenerationConfig) -> String {
    let jwt_provider = if config.strategy == AuthStrategy::Jwt {
        "\n        { provide: JwtService, useValue: { signAsync: jest.fn().mockResolvedValue('token') } },"
    } else {
        ""
    };
    let jwt_import = if config.strategy == AuthStrategy::Jwt {
        "import { JwtService } from '@nestjs/jwt';\n"
    } else {
        ""
    };
    format!(
        r#"import {{ Test }} from '@nestjs/testing';
import {{ UnauthorizedException }} from '@nestjs/common';
{jwt_import}import {{ AuthService }} from './auth.service';
import {{ UsersService }} from '../users/users.service';

describe('AuthService', () => {{
  let service: AuthService;
  const usersService = {{
    findByEmail: jest.fn(),
    create: jest.fn(),
  }};

  beforeEach(async () => {{
    const moduleRef = await Test.createTestingModule({{
      providers: [
        AuthService,
        {{ provide: UsersService, useValue: usersService }},{jwt_provider}
      ],
    }}).compile();
    service = moduleRef.get(AuthService);
  }});

  it('rejects unknown users', async () => {{
    usersService.findByEmail.mockResolvedValue(null);
    await expect(service.validateUser('a@b.c', 'pw')).rejects.toThrow(
      UnauthorizedException,
    );
  }});
}});
"#
    )
}

pub fn auth_controller_spec() -> String {
    r#"import { Test } from '@nestjs/testing';
import { AuthController } from './auth.controller';
import { AuthService } from './auth.service';

describe('AuthController', () => {
  let controller: AuthController;
  const authService = {
    login: jest.fn(),
    register: jest.fn(),
  };

  beforeEach(async () => {
    const moduleRef = await Test.createTestingModule({
      controllers: [AuthController],
      providers: [{ provide: AuthService, useValue: authService }],
    }).compile();
    controller = moduleRef.get(AuthController);
  });

  it('delegates login to the service', () => {
    controller.login({ user: { id: '1' } });
    expect(authService.login).toHaveBeenCalledWith({ id: '1' });
  });
});
"#
    .to_string()
}
